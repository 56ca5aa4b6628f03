use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, Context};
use crate::cli::OutputOptions;
use crate::display::format_ledger;
use crate::entity::RecordId;
use crate::error::Result;
use crate::stock::{Movement, StockAdjustment, StockClient};

/// Record a stock movement for a variation
pub async fn cmd_stock_add(
    variation: &str,
    quantity: u64,
    movement: Movement,
    note: Option<&str>,
    offline: bool,
    output: OutputOptions,
) -> Result<()> {
    let ctx = Context::new(offline)?;
    let client = StockClient::new(ctx.transport.clone());
    let variation_id = RecordId::new(variation);
    let adjustment = StockAdjustment {
        quantity,
        movement,
        note: note.map(String::from),
    };
    client.add_stock(&variation_id, &adjustment).await?;

    CommandOutput::new(json!({
        "action": "stock_added",
        "variation_id": variation_id,
        "quantity": quantity,
        "type": movement.as_str(),
    }))
    .with_text(format!(
        "Recorded {} {} for variation {}",
        movement.as_str().bold(),
        quantity,
        variation_id.to_string().cyan()
    ))
    .print(output)
}

/// Show a variation's stock ledger
pub async fn cmd_stock_ls(variation: &str, offline: bool, output: OutputOptions) -> Result<()> {
    let ctx = Context::new(offline)?;
    let client = StockClient::new(ctx.transport.clone());
    let ledger = client.get_stocks(&RecordId::new(variation)).await?;

    CommandOutput::new(serde_json::to_value(&ledger)?)
        .with_text(format_ledger(&ledger))
        .print(output)
}
