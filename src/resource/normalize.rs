//! Response-shape normalization.
//!
//! The backend is not consistent about where it puts list items or a single
//! entity. All the guessing happens here so the rest of the crate only ever
//! sees a [`Page`] or a plain object.

use serde_json::{Map, Value};

use super::{ListParams, Page};
use crate::error::{BackofficeError, Result};

/// Keys a paginator object may keep its items under.
const ITEM_KEYS: &[&str] = &["data", "rows", "items", "results"];

/// Keys a single entity may be nested under, besides the entity key.
const ENTITY_KEYS: &[&str] = &["data", "row"];

fn as_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Items and paginator metadata found in a list response.
struct RawPage {
    items: Vec<Value>,
    current_page: Option<u32>,
    last_page: Option<u32>,
    per_page: Option<u32>,
    total: Option<u32>,
}

impl RawPage {
    fn unpaginated(items: Vec<Value>) -> Self {
        Self {
            items,
            current_page: None,
            last_page: None,
            per_page: None,
            total: None,
        }
    }

    fn paginated(items: Vec<Value>, meta: &Map<String, Value>) -> Self {
        let meta_obj = meta.get("meta").and_then(Value::as_object);
        let lookup = |key: &str| as_u32(meta.get(key)).or_else(|| as_u32(meta_obj?.get(key)));
        Self {
            items,
            current_page: lookup("current_page"),
            last_page: lookup("last_page"),
            per_page: lookup("per_page"),
            total: lookup("total"),
        }
    }

    fn is_paginated(&self) -> bool {
        self.current_page.is_some() || self.total.is_some() || self.last_page.is_some()
    }
}

/// Object-of-records fallback: `{"1": {...}, "2": {...}}`.
fn object_values(map: &Map<String, Value>) -> Option<Vec<Value>> {
    if !map.is_empty() && map.values().all(Value::is_object) {
        Some(map.values().cloned().collect())
    } else {
        None
    }
}

fn find_raw_page(value: &Value, depth: usize) -> Option<RawPage> {
    match value {
        Value::Array(items) => Some(RawPage::unpaginated(items.clone())),
        Value::Object(map) if depth < 3 => {
            for key in ITEM_KEYS {
                match map.get(*key) {
                    Some(Value::Array(items)) => {
                        return Some(RawPage::paginated(items.clone(), map));
                    }
                    Some(inner @ Value::Object(_)) => {
                        if let Some(raw) = find_raw_page(inner, depth + 1) {
                            return Some(raw);
                        }
                    }
                    _ => {}
                }
            }
            if depth > 0 {
                return object_values(map).map(RawPage::unpaginated);
            }
            None
        }
        _ => None,
    }
}

/// Normalize a list response into a [`Page`] of raw objects.
///
/// Accepted shapes: a paginator under `data` (items in `data.data` or
/// `data.rows`), an array under `data`, an object of records under `data`,
/// or a bare array. Unpaginated arrays are paginated here with the
/// requested page and page size.
///
/// The result always satisfies `1 <= current_page <= last_page` and
/// `items.len() <= per_page`.
pub fn normalize_page(value: &Value, params: &ListParams) -> Result<Page<Value>> {
    let raw = find_raw_page(value, 0).ok_or_else(|| {
        BackofficeError::UnexpectedResponse("no list of records found in response".to_string())
    })?;

    if !raw.is_paginated() {
        return Ok(Page::paginate_locally(raw.items, params.page, params.per_page));
    }

    let per_page = raw.per_page.filter(|n| *n > 0).unwrap_or(params.per_page);
    let mut items = raw.items;
    if items.len() > per_page as usize {
        tracing::warn!(
            received = items.len(),
            per_page,
            "backend returned more items than the page size, truncating"
        );
        items.truncate(per_page as usize);
    }

    let total = raw.total.unwrap_or_else(|| {
        let last = raw.last_page.unwrap_or(1);
        last.saturating_sub(1)
            .saturating_mul(per_page)
            .saturating_add(items.len() as u32)
    });
    let last_page = raw
        .last_page
        .unwrap_or_else(|| Page::<Value>::last_page_for(total, per_page))
        .max(1);
    let current_page = raw.current_page.unwrap_or(params.page).clamp(1, last_page);

    Ok(Page {
        items,
        current_page,
        last_page,
        per_page,
        total,
    })
}

/// Normalize a create/update/get response into the entity object.
///
/// Accepts the object nested under `data`, `row`, or the collection's
/// entity key (possibly inside `data`), or the bare object.
pub fn normalize_entity(value: &Value, entity_key: &str) -> Result<Value> {
    fn unwrap(value: &Value, entity_key: &str, depth: usize) -> Option<Value> {
        let map = value.as_object()?;
        if depth < 3 {
            for key in std::iter::once(entity_key).chain(ENTITY_KEYS.iter().copied()) {
                if let Some(inner @ Value::Object(_)) = map.get(key) {
                    if let Some(found) = unwrap(inner, entity_key, depth + 1) {
                        return Some(found);
                    }
                }
            }
        }
        (map.contains_key("id") || map.contains_key("_id")).then(|| value.clone())
    }

    unwrap(value, entity_key, 0).ok_or_else(|| {
        BackofficeError::UnexpectedResponse(format!("no {entity_key} object found in response"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(page: u32, per_page: u32) -> ListParams {
        ListParams::new(page, per_page).unwrap()
    }

    #[test]
    fn test_paginator_under_data() {
        let body = json!({
            "status": true,
            "data": {
                "data": [{"id": 11}, {"id": 12}],
                "current_page": 2,
                "last_page": 3,
                "per_page": 10,
                "total": 22
            }
        });
        let page = normalize_page(&body, &params(2, 10)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.total, 22);
    }

    #[test]
    fn test_paginator_with_string_numbers_and_meta() {
        let body = json!({
            "data": [{"id": 1}],
            "meta": {"current_page": "1", "last_page": "4", "per_page": "1", "total": "4"}
        });
        let page = normalize_page(&body, &params(1, 10)).unwrap();
        assert_eq!(page.last_page, 4);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_rows_key() {
        let body = json!({"data": {"rows": [{"id": 1}, {"id": 2}], "total": 2}});
        let page = normalize_page(&body, &params(1, 10)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_page, 1);
    }

    #[test]
    fn test_bare_array_is_paginated_locally() {
        let items: Vec<Value> = (1..=25).map(|i| json!({"id": i})).collect();
        let page = normalize_page(&Value::Array(items), &params(3, 10)).unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0]["id"], json!(21));
    }

    #[test]
    fn test_array_under_data() {
        let body = json!({"status": true, "data": [{"id": 1}, {"id": 2}, {"id": 3}]});
        let page = normalize_page(&body, &params(1, 2)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_page, 2);
    }

    #[test]
    fn test_object_of_records_fallback() {
        let body = json!({"data": {"a": {"id": 1}, "b": {"id": 2}}});
        let page = normalize_page(&body, &params(1, 10)).unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_oversized_page_is_truncated() {
        let body = json!({
            "data": {"data": [{"id": 1}, {"id": 2}, {"id": 3}], "current_page": 1, "per_page": 2, "total": 3}
        });
        let page = normalize_page(&body, &params(1, 2)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_page, 2);
    }

    #[test]
    fn test_current_page_is_clamped() {
        let body = json!({"data": {"data": [], "current_page": 9, "last_page": 0, "total": 0}});
        let page = normalize_page(&body, &params(9, 10)).unwrap();
        assert_eq!(page.current_page, 1);
        assert_eq!(page.last_page, 1);
    }

    #[test]
    fn test_huge_last_page_without_total_saturates() {
        let body = json!({
            "data": {
                "data": [{"id": 1}],
                "current_page": 1,
                "last_page": 500_000_000,
                "per_page": 10
            }
        });
        let page = normalize_page(&body, &params(1, 10)).unwrap();
        assert_eq!(page.total, u32::MAX);
        assert_eq!(page.last_page, 500_000_000);
    }

    #[test]
    fn test_unrecognized_shape() {
        assert!(normalize_page(&json!({"status": true}), &params(1, 10)).is_err());
        assert!(normalize_page(&json!("nope"), &params(1, 10)).is_err());
    }

    #[test]
    fn test_entity_nesting_variants() {
        let expected = json!({"id": 5, "name": "Tea"});
        for body in [
            json!({"id": 5, "name": "Tea"}),
            json!({"status": true, "data": {"id": 5, "name": "Tea"}}),
            json!({"row": {"id": 5, "name": "Tea"}}),
            json!({"product": {"id": 5, "name": "Tea"}}),
            json!({"data": {"product": {"id": 5, "name": "Tea"}}}),
        ] {
            assert_eq!(normalize_entity(&body, "product").unwrap(), expected, "{body}");
        }
    }

    #[test]
    fn test_entity_missing() {
        assert!(normalize_entity(&json!({"status": true}), "product").is_err());
        assert!(normalize_entity(&json!([]), "product").is_err());
    }
}
