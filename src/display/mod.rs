//! Terminal rendering of records, pages and ledgers.

use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::entity::Record;
use crate::list::ListState;
use crate::notify::{Toast, ToastLevel};
use crate::resource::Page;
use crate::schema::Collection;
use crate::stock::{Movement, StockLedger};
use crate::validation::ValidationErrors;

const MAX_CELL_WIDTH: usize = 40;

/// Shorten a cell to `MAX_CELL_WIDTH` characters.
pub fn truncate_cell(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

pub fn format_status_colored(status: &str) -> String {
    match status {
        "active" => status.green().to_string(),
        "inactive" => status.dimmed().to_string(),
        "" => String::new(),
        other => other.yellow().to_string(),
    }
}

fn cell(record: &Record, column: &str) -> String {
    let text = truncate_cell(&record.text(column));
    if column == "status" {
        format_status_colored(&text)
    } else {
        text
    }
}

/// Render records as a table with an id column followed by the
/// collection's list columns.
pub fn records_table(collection: &Collection, records: &[Record]) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["ID".to_string()];
    header.extend(collection.columns.iter().map(|c| {
        collection
            .field(c)
            .map(|f| f.label.to_string())
            .unwrap_or_else(|| c.to_string())
    }));
    builder.push_record(header);

    for record in records {
        let mut row = vec![record.id.to_string()];
        row.extend(collection.columns.iter().map(|c| cell(record, c)));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

pub fn page_footer<T>(page: &Page<T>) -> String {
    format!(
        "Page {} of {} ({} record{})",
        page.current_page,
        page.last_page,
        page.total,
        if page.total == 1 { "" } else { "s" }
    )
}

/// Render a list state: the table, the page footer and any error.
pub fn format_list(collection: &Collection, state: &ListState<Record>) -> String {
    let mut out = String::new();
    match &state.page {
        Some(page) if page.items.is_empty() => {
            out.push_str(&format!("No {} found.\n", collection.name).dimmed().to_string());
        }
        Some(page) => {
            out.push_str(&records_table(collection, &page.items));
            out.push('\n');
            out.push_str(&page_footer(page).dimmed().to_string());
            out.push('\n');
        }
        None => {}
    }
    if let Some(error) = &state.error {
        out.push_str(&format!("{} {error}\n", "error:".red().bold()));
    }
    out
}

/// Render one record as `label: value` lines in schema order, followed by
/// any fields the schema does not know.
pub fn format_record(collection: &Collection, record: &Record) -> String {
    let mut out = format!("{} {}\n", "id:".cyan(), record.id);
    for spec in collection.fields {
        if let Some(value) = record.get(spec.name)
            && !value.is_null()
        {
            out.push_str(&format!(
                "{} {}\n",
                format!("{}:", spec.name).cyan(),
                record.text(spec.name)
            ));
        }
    }
    for (name, _) in record.fields.iter() {
        if collection.field(name).is_none() {
            out.push_str(&format!(
                "{} {}\n",
                format!("{name}:").dimmed(),
                record.text(name)
            ));
        }
    }
    out
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut out = format!("{}\n", "Please fix the following fields:".red().bold());
    for (field, message) in errors.iter() {
        out.push_str(&format!("  {} {message}\n", format!("{field}:").yellow()));
    }
    out
}

pub fn format_toast(toast: &Toast) -> String {
    match toast.level {
        ToastLevel::Success => toast.message.green().to_string(),
        ToastLevel::Info => toast.message.cyan().to_string(),
        ToastLevel::Warning => toast.message.yellow().to_string(),
        ToastLevel::Error => toast.message.red().to_string(),
    }
}

pub fn format_ledger(ledger: &StockLedger) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Movement", "Quantity", "Note", "Date"]);
    for entry in &ledger.stocks {
        let movement = match entry.movement {
            Movement::In => "in".green().to_string(),
            Movement::Out => "out".red().to_string(),
        };
        builder.push_record([
            entry.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            movement,
            entry.quantity.to_string(),
            truncate_cell(entry.note.as_deref().unwrap_or("")),
            entry.created_at.clone().unwrap_or_default(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    format!(
        "{table}\n{} {}\n",
        "On hand:".bold(),
        ledger.current_stock
    )
}
