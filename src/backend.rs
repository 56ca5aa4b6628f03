//! In-memory implementation of the back-office REST contract.
//!
//! [`InMemoryBackend`] answers the same requests the real API does, with the
//! same response shapes, so controllers can run without a server: in tests
//! and in `--offline` mode.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::entity::RecordId;
use crate::error::{BackofficeError, Result};
use crate::http::{ApiRequest, RequestBody, Transport};
use crate::resource::Page;
use crate::schema::COLLECTIONS;

#[derive(Debug, Default)]
struct Store {
    /// Records per collection path, newest first
    collections: HashMap<String, Vec<Map<String, Value>>>,
    /// Stock ledger per variation id, oldest first
    ledgers: HashMap<String, Vec<Value>>,
    next_id: u64,
    failures: VecDeque<BackofficeError>,
    requests: Vec<ApiRequest>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

fn not_found(what: &str) -> BackofficeError {
    BackofficeError::Request {
        status: Some(404),
        message: format!("{what} not found"),
    }
}

fn not_allowed(method: &Method) -> BackofficeError {
    BackofficeError::Request {
        status: Some(405),
        message: format!("method {method} not allowed"),
    }
}

fn ok(data: Value) -> Value {
    json!({ "status": true, "data": data })
}

fn record_id(record: &Map<String, Value>) -> Option<RecordId> {
    record.get("id").and_then(RecordId::from_value)
}

fn matches_search(record: &Map<String, Value>, needle: &str) -> bool {
    record.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string() == needle,
        _ => false,
    })
}

fn body_fields(body: &RequestBody) -> Map<String, Value> {
    match body {
        RequestBody::Empty => Map::new(),
        RequestBody::Json(Value::Object(map)) => map.clone(),
        RequestBody::Json(_) => Map::new(),
        RequestBody::Multipart { fields, files } => {
            let mut fields = fields.clone();
            for file in files {
                fields.insert(
                    file.field.clone(),
                    Value::String(format!("uploads/{}", file.file_name)),
                );
            }
            fields
        }
    }
}

fn query_number(request: &ApiRequest, key: &str, default: u32) -> Result<u32> {
    match request.query_value(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| BackofficeError::Request {
            status: Some(422),
            message: format!("The {key} must be an integer."),
        }),
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records to a collection, keeping their order. Records without an
    /// id get one.
    pub fn with_records(self, path: &str, records: Vec<Value>) -> Self {
        {
            let mut store = self.store.lock();
            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                let Value::Object(mut map) = record else {
                    continue;
                };
                match record_id(&map).and_then(|id| id.as_str().parse::<u64>().ok()) {
                    Some(n) => store.next_id = store.next_id.max(n),
                    None => {
                        let id = store.next_id();
                        map.insert("id".to_string(), json!(id));
                    }
                }
                rows.push(map);
            }
            store
                .collections
                .entry(path.to_string())
                .or_default()
                .extend(rows);
        }
        self
    }

    /// A backend with a small catalogue for demos.
    pub fn seeded() -> Self {
        let products = (1..=25)
            .rev()
            .map(|n| {
                json!({
                    "id": 100 + n,
                    "name": format!("Product {n:02}"),
                    "sku": format!("SKU-{n:04}"),
                    "category_id": 1 + n % 3,
                    "mrp": 100 + n * 10,
                    "price": 90 + n * 10,
                    "unit": "pcs",
                    "status": "active"
                })
            })
            .collect();

        Self::new()
            .with_records(
                "categories",
                vec![
                    json!({"id": 1, "name": "Beverages", "status": "active"}),
                    json!({"id": 2, "name": "Snacks", "status": "active"}),
                    json!({"id": 3, "name": "Personal care", "status": "inactive"}),
                ],
            )
            .with_records(
                "brands",
                vec![
                    json!({"id": 11, "name": "Sunrise", "status": "active"}),
                    json!({"id": 12, "name": "Hilltop", "status": "active"}),
                ],
            )
            .with_records("products", products)
            .with_records(
                "shops",
                vec![json!({
                    "id": 201,
                    "name": "Lakshmi Stores",
                    "owner_name": "R. Lakshmi",
                    "phone": "9876543210",
                    "address": "12 Market Road",
                    "pincode": "600083",
                    "district": "Chennai",
                    "state": "Tamil Nadu"
                })],
            )
    }

    /// Make the next request fail with `error`, whatever it is.
    pub fn fail_next(&self, error: BackofficeError) {
        self.store.lock().failures.push_back(error);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.store.lock().requests.clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.store
            .lock()
            .collections
            .get(path)
            .map_or(0, Vec::len)
    }

    fn list(store: &Store, path: &str, request: &ApiRequest) -> Result<Value> {
        let page = query_number(request, "page", 1)?.max(1);
        let per_page = query_number(request, "per_page", 10)?.max(1);
        let needle = request
            .query_value("search")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let rows: Vec<Value> = store
            .collections
            .get(path)
            .into_iter()
            .flatten()
            .filter(|record| needle.as_deref().is_none_or(|n| matches_search(record, n)))
            .cloned()
            .map(Value::Object)
            .collect();

        let page = Page::paginate_locally(rows, page, per_page);
        Ok(ok(json!({
            "data": page.items,
            "current_page": page.current_page,
            "last_page": page.last_page,
            "per_page": page.per_page,
            "total": page.total,
        })))
    }

    fn create(store: &mut Store, path: &str, request: &ApiRequest) -> Result<Value> {
        let mut record = body_fields(&request.body);
        let id = store.next_id();
        record.insert("id".to_string(), json!(id));
        store
            .collections
            .entry(path.to_string())
            .or_default()
            .insert(0, record.clone());
        Ok(ok(Value::Object(record)))
    }

    fn find_index(store: &Store, path: &str, id: &str) -> Result<usize> {
        store
            .collections
            .get(path)
            .and_then(|rows| {
                rows.iter()
                    .position(|r| record_id(r).is_some_and(|rid| rid.as_str() == id))
            })
            .ok_or_else(|| not_found("record"))
    }

    fn item(store: &mut Store, path: &str, id: &str, request: &ApiRequest) -> Result<Value> {
        let index = Self::find_index(store, path, id)?;
        let rows = store.collections.entry(path.to_string()).or_default();
        let method = request.effective_method();
        if method == Method::GET {
            Ok(ok(Value::Object(rows[index].clone())))
        } else if method == Method::PUT || method == Method::PATCH {
            let record = &mut rows[index];
            for (key, value) in body_fields(&request.body) {
                if key != "id" {
                    record.insert(key, value);
                }
            }
            Ok(ok(Value::Object(record.clone())))
        } else if method == Method::DELETE {
            rows.remove(index);
            Ok(json!({ "status": true }))
        } else {
            Err(not_allowed(&method))
        }
    }

    fn stocks(store: &mut Store, variation_id: &str, request: &ApiRequest) -> Result<Value> {
        let ledger = store.ledgers.entry(variation_id.to_string()).or_default();
        let on_hand: i64 = ledger
            .iter()
            .map(|e| {
                let quantity = e["quantity"].as_i64().unwrap_or(0);
                if e["type"] == "out" { -quantity } else { quantity }
            })
            .sum();

        if request.method == Method::GET {
            return Ok(ok(json!({
                "stocks": ledger.clone(),
                "current_stock": on_hand,
            })));
        }
        if request.method != Method::POST {
            return Err(not_allowed(&request.method));
        }

        let body = body_fields(&request.body);
        let quantity = body
            .get("quantity")
            .and_then(Value::as_i64)
            .filter(|q| *q > 0)
            .ok_or_else(|| BackofficeError::Request {
                status: Some(422),
                message: "The quantity must be at least 1.".to_string(),
            })?;
        let movement = body.get("type").and_then(Value::as_str).unwrap_or("in");
        if movement == "out" && quantity > on_hand {
            return Err(BackofficeError::Request {
                status: Some(422),
                message: "Insufficient stock".to_string(),
            });
        }
        let id = store.next_id();
        let mut entry = body;
        entry.insert("id".to_string(), json!(id));
        store
            .ledgers
            .entry(variation_id.to_string())
            .or_default()
            .push(Value::Object(entry));
        Ok(json!({ "status": true, "message": "Stock updated" }))
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut store = self.store.lock();
        store.requests.push(request.clone());
        if let Some(error) = store.failures.pop_front() {
            tracing::debug!(path = %request.path, "injected failure: {error}");
            return Err(error);
        }

        let segments: Vec<&str> = request
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            ["variations", id, "stocks"] => Self::stocks(&mut store, id, &request),
            [path] if COLLECTIONS.iter().any(|c| c.path == *path) => {
                let method = request.effective_method();
                if method == Method::GET {
                    Self::list(&store, path, &request)
                } else if method == Method::POST {
                    Self::create(&mut store, path, &request)
                } else {
                    Err(not_allowed(&method))
                }
            }
            [path, id] if COLLECTIONS.iter().any(|c| c.path == *path) => {
                Self::item(&mut store, path, id, &request)
            }
            _ => Err(not_found("endpoint")),
        }
    }
}
