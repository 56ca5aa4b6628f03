use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::autofill::{AddressAutofill, AddressFragment, PublicAutofill};
use crate::cli::OutputOptions;
use crate::config::Config;
use crate::error::Result;

fn autofill_client() -> Result<PublicAutofill> {
    let config = Config::load()?;
    PublicAutofill::new(config.postal_api(), config.geocoder(), config.timeout())
}

fn print_fragment(fragment: Option<AddressFragment>, output: OutputOptions) -> Result<()> {
    match fragment {
        Some(fragment) => {
            let fields = fragment.into_fields();
            let text = fields
                .iter()
                .map(|(k, v)| format!("{} {}", format!("{k}:").cyan(), v.as_str().unwrap_or("")))
                .collect::<Vec<_>>()
                .join("\n");
            CommandOutput::new(json!({ "found": true, "address": fields }))
                .with_text(text)
                .print(output)
        }
        None => CommandOutput::new(json!({ "found": false }))
            .with_text("No address found".dimmed().to_string())
            .print(output),
    }
}

/// Look up state and district for a postal code
pub async fn cmd_autofill_pincode(pincode: &str, output: OutputOptions) -> Result<()> {
    let fragment = autofill_client()?.lookup_pincode(pincode).await;
    print_fragment(fragment, output)
}

/// Reverse-geocode a coordinate pair
pub async fn cmd_autofill_geo(latitude: f64, longitude: f64, output: OutputOptions) -> Result<()> {
    let fragment = autofill_client()?
        .reverse_geocode(latitude, longitude)
        .await;
    print_fragment(fragment, output)
}
