//! Client-side field validation for forms.
//!
//! Validation is synchronous and per-field. It never talks to the server and
//! its errors never leave the form controller except as a blocked submit.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{FieldKind, FieldSpec};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern is valid"));
static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("pincode pattern is valid"));

/// Field name to message. Empty means the draft is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validate a single field value. `has_file` tells whether a file was
/// attached for an image field.
pub fn validate_field(spec: &FieldSpec, value: Option<&Value>, has_file: bool) -> Option<String> {
    if spec.kind == FieldKind::Image {
        if spec.required && !has_file && is_blank(value) {
            return Some(format!("{} is required", spec.label));
        }
        return None;
    }

    if is_blank(value) {
        return spec
            .required
            .then(|| format!("{} is required", spec.label));
    }
    let value = value?;

    match spec.kind {
        FieldKind::Text { max_len } => {
            let text = as_text(value)?;
            let count = text.chars().count();
            (count > max_len).then(|| {
                format!(
                    "{} must be at most {} characters (got {})",
                    spec.label, max_len, count
                )
            })
        }
        FieldKind::Email => match as_text(value) {
            Some(t) if EMAIL_RE.is_match(&t) => None,
            _ => Some(format!("{} must be a valid email address", spec.label)),
        },
        FieldKind::Phone => match as_text(value) {
            Some(t) if PHONE_RE.is_match(&t) => None,
            _ => Some(format!("{} must be a 10-digit number", spec.label)),
        },
        FieldKind::Pincode => match as_text(value) {
            Some(t) if PINCODE_RE.is_match(&t) => None,
            _ => Some(format!("{} must be a 6-digit postal code", spec.label)),
        },
        FieldKind::Decimal => match as_number(value) {
            Some(n) if n.is_finite() && n >= 0.0 => None,
            Some(_) => Some(format!("{} cannot be negative", spec.label)),
            None => Some(format!("{} must be a number", spec.label)),
        },
        FieldKind::Integer => match as_number(value) {
            Some(n) if n.fract() == 0.0 && n >= 0.0 => None,
            _ => Some(format!("{} must be a whole number", spec.label)),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => None,
            Value::String(s) if matches!(s.as_str(), "true" | "false" | "1" | "0") => None,
            Value::Number(n) if n.as_u64().is_some_and(|n| n <= 1) => None,
            _ => Some(format!("{} must be true or false", spec.label)),
        },
        FieldKind::Choice(allowed) => match as_text(value) {
            Some(t) if allowed.contains(&t.as_str()) => None,
            _ => Some(format!(
                "{} must be one of: {}",
                spec.label,
                allowed.join(", ")
            )),
        },
        FieldKind::Reference(_) => match RecordIdShape::of(value) {
            RecordIdShape::Valid => None,
            RecordIdShape::Invalid => Some(format!("{} must be a record id", spec.label)),
        },
        FieldKind::Latitude => match as_number(value) {
            Some(n) if (-90.0..=90.0).contains(&n) => None,
            _ => Some(format!("{} must be between -90 and 90", spec.label)),
        },
        FieldKind::Longitude => match as_number(value) {
            Some(n) if (-180.0..=180.0).contains(&n) => None,
            _ => Some(format!("{} must be between -180 and 180", spec.label)),
        },
        FieldKind::Image => None,
    }
}

enum RecordIdShape {
    Valid,
    Invalid,
}

impl RecordIdShape {
    fn of(value: &Value) -> Self {
        match crate::entity::RecordId::from_value(value) {
            Some(id) if !id.is_local() => RecordIdShape::Valid,
            _ => RecordIdShape::Invalid,
        }
    }
}

/// Validate every field of a draft against its schema.
///
/// `files` lists the field names that have an attached upload.
pub fn validate_fields(
    specs: &[FieldSpec],
    values: &Map<String, Value>,
    files: &[&str],
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for spec in specs {
        let has_file = files.contains(&spec.name);
        if let Some(message) = validate_field(spec, values.get(spec.name), has_file) {
            errors.insert(spec.name, message);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SHOPS, VENDORS};
    use serde_json::json;

    fn spec(kind: FieldKind, required: bool) -> FieldSpec {
        FieldSpec {
            name: "f",
            label: "Field",
            kind,
            required,
        }
    }

    #[test]
    fn test_required_blank_values() {
        let s = spec(FieldKind::Text { max_len: 10 }, true);
        assert_eq!(
            validate_field(&s, None, false).as_deref(),
            Some("Field is required")
        );
        assert!(validate_field(&s, Some(&json!("   ")), false).is_some());
        assert!(validate_field(&s, Some(&json!(null)), false).is_some());
        assert!(validate_field(&s, Some(&json!("ok")), false).is_none());
    }

    #[test]
    fn test_optional_blank_is_valid() {
        let s = spec(FieldKind::Email, false);
        assert!(validate_field(&s, None, false).is_none());
        assert!(validate_field(&s, Some(&json!("")), false).is_none());
    }

    #[test]
    fn test_text_length_counts_characters() {
        let s = spec(FieldKind::Text { max_len: 3 }, false);
        assert!(validate_field(&s, Some(&json!("héé")), false).is_none());
        assert!(validate_field(&s, Some(&json!("abcd")), false).is_some());
    }

    #[test]
    fn test_patterns() {
        let email = spec(FieldKind::Email, true);
        assert!(validate_field(&email, Some(&json!("a@b.in")), false).is_none());
        assert!(validate_field(&email, Some(&json!("a@b")), false).is_some());

        let phone = spec(FieldKind::Phone, true);
        assert!(validate_field(&phone, Some(&json!("9876543210")), false).is_none());
        assert!(validate_field(&phone, Some(&json!(9876543210u64)), false).is_none());
        assert!(validate_field(&phone, Some(&json!("98765")), false).is_some());

        let pin = spec(FieldKind::Pincode, true);
        assert!(validate_field(&pin, Some(&json!("560001")), false).is_none());
        assert!(validate_field(&pin, Some(&json!("060001")), false).is_some());
        assert!(validate_field(&pin, Some(&json!("56001")), false).is_some());
    }

    #[test]
    fn test_numbers() {
        let dec = spec(FieldKind::Decimal, true);
        assert!(validate_field(&dec, Some(&json!("12.50")), false).is_none());
        assert_eq!(
            validate_field(&dec, Some(&json!(-1)), false).as_deref(),
            Some("Field cannot be negative")
        );
        assert!(validate_field(&dec, Some(&json!("abc")), false).is_some());

        let int = spec(FieldKind::Integer, true);
        assert!(validate_field(&int, Some(&json!(5)), false).is_none());
        assert!(validate_field(&int, Some(&json!("2.5")), false).is_some());
    }

    #[test]
    fn test_choice_and_coordinates() {
        let choice = spec(FieldKind::Choice(&["in", "out"]), true);
        assert!(validate_field(&choice, Some(&json!("in")), false).is_none());
        assert!(validate_field(&choice, Some(&json!("sideways")), false).is_some());

        let lat = spec(FieldKind::Latitude, false);
        assert!(validate_field(&lat, Some(&json!(12.97)), false).is_none());
        assert!(validate_field(&lat, Some(&json!(91)), false).is_some());

        let lon = spec(FieldKind::Longitude, false);
        assert!(validate_field(&lon, Some(&json!("-77.5")), false).is_none());
        assert!(validate_field(&lon, Some(&json!(181)), false).is_some());
    }

    #[test]
    fn test_reference_rejects_local_ids() {
        let s = spec(FieldKind::Reference("brands"), true);
        assert!(validate_field(&s, Some(&json!(4)), false).is_none());
        assert!(validate_field(&s, Some(&json!("local-abc")), false).is_some());
    }

    #[test]
    fn test_required_image_accepts_attached_file() {
        let s = spec(FieldKind::Image, true);
        assert!(validate_field(&s, None, false).is_some());
        assert!(validate_field(&s, None, true).is_none());
        assert!(validate_field(&s, Some(&json!("https://cdn/x.png")), false).is_none());
    }

    #[test]
    fn test_validate_fields_collects_per_field() {
        let mut values = Map::new();
        values.insert("name".into(), json!("Acme Traders"));
        values.insert("phone".into(), json!("123"));
        values.insert("email".into(), json!("not-an-email"));

        let errors = validate_fields(VENDORS.fields, &values, &[]);
        assert_eq!(errors.len(), 2);
        assert!(errors.get("phone").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn test_shop_schema_requires_core_fields() {
        let errors = validate_fields(SHOPS.fields, &Map::new(), &[]);
        let fields: Vec<&str> = errors.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["address", "name", "owner_name", "phone"]);
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.insert("b", "bad");
        errors.insert("a", "worse");
        assert_eq!(errors.to_string(), "a: worse; b: bad");
    }
}
