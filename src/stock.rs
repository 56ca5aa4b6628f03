//! Stock movements for product variations.
//!
//! Stock is not edited through the generic collection forms: every change is
//! an inward or outward movement appended to the variation's ledger at
//! `variations/{id}/stocks`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::entity::RecordId;
use crate::error::{BackofficeError, Result};
use crate::http::{ApiRequest, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    In,
    Out,
}

crate::wire_enum!(Movement, "stock movement", {
    In => "in",
    Out => "out",
});

impl Movement {
    /// Signed quantity of a movement.
    pub fn signed(&self, quantity: u64) -> i64 {
        let quantity = i64::try_from(quantity).unwrap_or(i64::MAX);
        match self {
            Movement::In => quantity,
            Movement::Out => -quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub quantity: u64,
    pub movement: Movement,
    pub note: Option<String>,
}

impl StockAdjustment {
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(BackofficeError::InvalidInput(
                "quantity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut body = json!({
            "quantity": self.quantity,
            "type": self.movement,
        });
        if let Some(note) = self.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            body["note"] = Value::String(note.to_string());
        }
        body
    }
}

/// One line of a variation's stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockEntry {
    pub id: Option<RecordId>,
    pub quantity: u64,
    pub movement: Movement,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

impl StockEntry {
    fn from_json(value: &Value) -> Result<Self> {
        let quantity = match value.get("quantity") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            BackofficeError::UnexpectedResponse("stock entry without a quantity".to_string())
        })?;
        let movement = value
            .get("type")
            .or_else(|| value.get("movement"))
            .and_then(Value::as_str)
            .unwrap_or("in")
            .parse()?;
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);

        Ok(Self {
            id: value.get("id").and_then(RecordId::from_value),
            quantity,
            movement,
            note: text("note"),
            created_at: text("created_at"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLedger {
    pub variation_id: RecordId,
    pub stocks: Vec<StockEntry>,
    /// Stock on hand as reported by the backend, or summed from the entries
    pub current_stock: i64,
}

impl StockLedger {
    /// Read a ledger response. Entries may sit under `data.stocks`,
    /// `data`, `stocks` or be the body itself.
    pub fn from_json(variation_id: RecordId, body: &Value) -> Result<Self> {
        let data = body.get("data").unwrap_or(body);
        let entries = data
            .get("stocks")
            .or_else(|| body.get("stocks"))
            .unwrap_or(data);
        let Value::Array(entries) = entries else {
            return Err(BackofficeError::UnexpectedResponse(
                "stock ledger is not a list".to_string(),
            ));
        };
        let stocks = entries
            .iter()
            .map(StockEntry::from_json)
            .collect::<Result<Vec<_>>>()?;

        let current_stock = data
            .get("current_stock")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| stocks.iter().map(|e| e.movement.signed(e.quantity)).sum());

        Ok(Self {
            variation_id,
            stocks,
            current_stock,
        })
    }
}

pub struct StockClient {
    transport: Arc<dyn Transport>,
}

impl StockClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn ledger_path(variation_id: &RecordId) -> Result<String> {
        if variation_id.is_local() {
            return Err(BackofficeError::InvalidInput(format!(
                "'{variation_id}' is a local placeholder id"
            )));
        }
        Ok(format!("variations/{variation_id}/stocks"))
    }

    pub async fn add_stock(&self, variation_id: &RecordId, adjustment: &StockAdjustment) -> Result<()> {
        adjustment.validate()?;
        let request = ApiRequest::post(Self::ledger_path(variation_id)?).json(adjustment.to_json());
        self.transport.send(request).await?;
        tracing::debug!(
            %variation_id,
            quantity = adjustment.quantity,
            movement = %adjustment.movement,
            "recorded stock movement"
        );
        Ok(())
    }

    pub async fn get_stocks(&self, variation_id: &RecordId) -> Result<StockLedger> {
        let body = self
            .transport
            .send(ApiRequest::get(Self::ledger_path(variation_id)?))
            .await?;
        StockLedger::from_json(variation_id.clone(), &body)
    }
}
