//! Field schemas for the back-office collections.
//!
//! One [`Collection`] per REST collection replaces a hand-written screen per
//! entity: the list, form and CLI code is shared and only the schema varies.

use crate::error::{BackofficeError, Result};

/// Kind of value a form field holds, with the rules validation applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Free text with a maximum length in characters
    Text { max_len: usize },
    Email,
    /// 10-digit phone number
    Phone,
    /// 6-digit postal code
    Pincode,
    /// Non-negative decimal (prices, weights)
    Decimal,
    /// Non-negative integer (quantities)
    Integer,
    Boolean,
    /// One of a fixed set of values
    Choice(&'static [&'static str]),
    /// Id of a record in another collection
    Reference(&'static str),
    /// Uploaded file, sent as multipart
    Image,
    Latitude,
    Longitude,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required: false,
    }
}

const NAME: FieldKind = FieldKind::Text { max_len: 120 };
const LONG_TEXT: FieldKind = FieldKind::Text { max_len: 2000 };
const ADDRESS: FieldKind = FieldKind::Text { max_len: 255 };
const STATUS: FieldKind = FieldKind::Choice(&["active", "inactive"]);

/// A REST collection and its form schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collection {
    /// Name used on the command line, plural
    pub name: &'static str,
    /// Path segment under the API base URL
    pub path: &'static str,
    /// Key some endpoints nest a single entity under, e.g. `{"product": {...}}`
    pub entity_key: &'static str,
    pub fields: &'static [FieldSpec],
    /// Fields shown as list columns, in order
    pub columns: &'static [&'static str],
}

impl Collection {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_file_fields(&self) -> bool {
        self.fields.iter().any(|f| f.kind == FieldKind::Image)
    }

    /// Resolve a collection from user input. Accepts plural or singular
    /// names in any case, and the entity key.
    pub fn by_name(name: &str) -> Result<&'static Collection> {
        let needle = name.trim().to_lowercase();
        COLLECTIONS
            .iter()
            .copied()
            .find(|c| c.name == needle || c.entity_key == needle || c.path == needle)
            .ok_or_else(|| BackofficeError::UnknownCollection(name.to_string()))
    }
}

pub static PRODUCTS: Collection = Collection {
    name: "products",
    path: "products",
    entity_key: "product",
    fields: &[
        required("name", "Name", NAME),
        required("sku", "SKU", FieldKind::Text { max_len: 64 }),
        required("category_id", "Category", FieldKind::Reference("categories")),
        optional("brand_id", "Brand", FieldKind::Reference("brands")),
        optional("vendor_id", "Vendor", FieldKind::Reference("vendors")),
        required("mrp", "MRP", FieldKind::Decimal),
        required("price", "Selling price", FieldKind::Decimal),
        optional("unit", "Unit", FieldKind::Choice(&["pcs", "kg", "g", "l", "ml", "box"])),
        optional("description", "Description", LONG_TEXT),
        optional("image", "Image", FieldKind::Image),
        optional("status", "Status", STATUS),
    ],
    columns: &["name", "sku", "price", "status"],
};

pub static CATEGORIES: Collection = Collection {
    name: "categories",
    path: "categories",
    entity_key: "category",
    fields: &[
        required("name", "Name", NAME),
        optional("parent_id", "Parent category", FieldKind::Reference("categories")),
        optional("description", "Description", LONG_TEXT),
        optional("image", "Image", FieldKind::Image),
        optional("status", "Status", STATUS),
    ],
    columns: &["name", "parent_id", "status"],
};

pub static BRANDS: Collection = Collection {
    name: "brands",
    path: "brands",
    entity_key: "brand",
    fields: &[
        required("name", "Name", NAME),
        optional("description", "Description", LONG_TEXT),
        optional("logo", "Logo", FieldKind::Image),
        optional("status", "Status", STATUS),
    ],
    columns: &["name", "status"],
};

pub static VENDORS: Collection = Collection {
    name: "vendors",
    path: "vendors",
    entity_key: "vendor",
    fields: &[
        required("name", "Name", NAME),
        optional("contact_person", "Contact person", NAME),
        required("phone", "Phone", FieldKind::Phone),
        optional("email", "Email", FieldKind::Email),
        optional("gstin", "GSTIN", FieldKind::Text { max_len: 15 }),
        optional("address", "Address", ADDRESS),
        optional("pincode", "Pincode", FieldKind::Pincode),
        optional("state", "State", NAME),
        optional("district", "District", NAME),
    ],
    columns: &["name", "phone", "email", "district"],
};

pub static STOCKS: Collection = Collection {
    name: "stocks",
    path: "stocks",
    entity_key: "stock",
    fields: &[
        required("variation_id", "Variation", FieldKind::Reference("products")),
        required("quantity", "Quantity", FieldKind::Integer),
        required("type", "Movement", FieldKind::Choice(&["in", "out"])),
        optional("note", "Note", FieldKind::Text { max_len: 255 }),
    ],
    columns: &["variation_id", "quantity", "type", "note"],
};

pub static TERRITORIES: Collection = Collection {
    name: "territories",
    path: "territories",
    entity_key: "territory",
    fields: &[
        required("name", "Name", NAME),
        optional("code", "Code", FieldKind::Text { max_len: 32 }),
        optional("manager_id", "Territory manager", FieldKind::Reference("employees")),
        optional("state", "State", NAME),
        optional("district", "District", NAME),
    ],
    columns: &["name", "code", "state", "district"],
};

pub static EMPLOYEES: Collection = Collection {
    name: "employees",
    path: "employees",
    entity_key: "employee",
    fields: &[
        required("name", "Name", NAME),
        required("phone", "Phone", FieldKind::Phone),
        optional("email", "Email", FieldKind::Email),
        required(
            "role",
            "Role",
            FieldKind::Choice(&["admin", "manager", "tsm", "sales", "delivery"]),
        ),
        optional("territory_id", "Territory", FieldKind::Reference("territories")),
        optional("address", "Address", ADDRESS),
        optional("pincode", "Pincode", FieldKind::Pincode),
        optional("photo", "Photo", FieldKind::Image),
        optional("status", "Status", STATUS),
    ],
    columns: &["name", "phone", "role", "status"],
};

pub static FRANCHISES: Collection = Collection {
    name: "franchises",
    path: "franchises",
    entity_key: "franchise",
    fields: &[
        required("name", "Name", NAME),
        required("owner_name", "Owner", NAME),
        required("phone", "Phone", FieldKind::Phone),
        optional("email", "Email", FieldKind::Email),
        optional("gstin", "GSTIN", FieldKind::Text { max_len: 15 }),
        required("address", "Address", ADDRESS),
        required("pincode", "Pincode", FieldKind::Pincode),
        optional("state", "State", NAME),
        optional("district", "District", NAME),
        optional("status", "Status", STATUS),
    ],
    columns: &["name", "owner_name", "phone", "district"],
};

pub static SHOPS: Collection = Collection {
    name: "shops",
    path: "shops",
    entity_key: "shop",
    fields: &[
        required("name", "Name", NAME),
        required("owner_name", "Owner", NAME),
        required("phone", "Phone", FieldKind::Phone),
        optional("territory_id", "Territory", FieldKind::Reference("territories")),
        optional("franchise_id", "Franchise", FieldKind::Reference("franchises")),
        required("address", "Address", ADDRESS),
        optional("pincode", "Pincode", FieldKind::Pincode),
        optional("state", "State", NAME),
        optional("district", "District", NAME),
        optional("latitude", "Latitude", FieldKind::Latitude),
        optional("longitude", "Longitude", FieldKind::Longitude),
        optional("is_verified", "Verified", FieldKind::Boolean),
        optional("photo", "Shop photo", FieldKind::Image),
    ],
    columns: &["name", "owner_name", "phone", "district"],
};

pub static COLLECTIONS: &[&Collection] = &[
    &PRODUCTS,
    &CATEGORIES,
    &BRANDS,
    &VENDORS,
    &STOCKS,
    &TERRITORIES,
    &EMPLOYEES,
    &FRANCHISES,
    &SHOPS,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_by_name_accepts_plural_singular_and_case() {
        assert_eq!(Collection::by_name("products").unwrap().path, "products");
        assert_eq!(Collection::by_name("Product").unwrap().path, "products");
        assert_eq!(Collection::by_name(" SHOPS ").unwrap().path, "shops");
        assert!(matches!(
            Collection::by_name("widgets"),
            Err(BackofficeError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_collection_names_are_unique() {
        let names: HashSet<_> = COLLECTIONS.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), COLLECTIONS.len());
    }

    #[test]
    fn test_columns_are_declared_fields() {
        for collection in COLLECTIONS {
            for column in collection.columns {
                assert!(
                    collection.field(column).is_some(),
                    "{} lists unknown column {}",
                    collection.name,
                    column
                );
            }
        }
    }

    #[test]
    fn test_references_point_at_known_collections() {
        for collection in COLLECTIONS {
            for field in collection.fields {
                if let FieldKind::Reference(target) = field.kind {
                    assert!(Collection::by_name(target).is_ok(), "{target}");
                }
            }
        }
    }

    #[test]
    fn test_file_fields() {
        assert!(PRODUCTS.has_file_fields());
        assert!(!STOCKS.has_file_fields());
    }
}
