//! Records exchanged with the back-office API.
//!
//! The backend owns every entity; the client only needs an id and a bag of
//! fields. Controllers are generic over [`Entity`] so a typed model can be
//! plugged in where one exists, while [`Record`] covers every collection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BackofficeError, Result};

const LOCAL_ID_PREFIX: &str = "local-";

/// Identifier of a record, either assigned by the server or generated
/// locally for an optimistic placeholder row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh id for a placeholder row. Never sent to the server.
    pub fn local() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id from a JSON value. Numbers and non-empty strings are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// An entity the list and form controllers can manage.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &RecordId;

    /// Build the entity from a normalized server object.
    fn from_json(value: Value) -> Result<Self>;

    /// Build the entity from form fields, used for optimistic rows.
    fn from_draft(id: RecordId, fields: &Map<String, Value>) -> Self;

    /// Editable fields, used to prefill an edit form.
    fn fields(&self) -> Map<String, Value>;
}

/// Opaque record: an id plus whatever fields the backend returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field rendered as display text. Strings lose their quotes, nulls are empty.
    pub fn text(&self, name: &str) -> String {
        match self.fields.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl Entity for Record {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(BackofficeError::UnexpectedResponse(
                "expected a JSON object for a record".to_string(),
            ));
        };

        let id = fields
            .remove("id")
            .as_ref()
            .and_then(RecordId::from_value)
            .or_else(|| fields.get("_id").and_then(RecordId::from_value))
            .ok_or_else(|| {
                BackofficeError::UnexpectedResponse("record has no usable 'id' field".to_string())
            })?;

        Ok(Self { id, fields })
    }

    fn from_draft(id: RecordId, fields: &Map<String, Value>) -> Self {
        let mut fields = fields.clone();
        fields.remove("id");
        Self { id, fields }
    }

    fn fields(&self) -> Map<String, Value> {
        self.fields.clone()
    }
}
