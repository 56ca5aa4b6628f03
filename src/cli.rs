use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;

use crate::stock::Movement;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Manage the retail back office from the terminal")]
#[command(version)]
pub struct Cli {
    /// Run against a seeded in-memory backend instead of the API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FieldArgs {
    /// Field value as name=value (repeatable)
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Upload a file into an image field as name=path (repeatable)
    #[arg(short = 'f', long = "file", value_name = "NAME=PATH")]
    pub files: Vec<String>,

    /// Fill state/district from the postal code before submitting
    #[arg(long)]
    pub autofill: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records of a collection
    Ls {
        /// Collection name (e.g. products, shops)
        collection: String,

        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Records per page (default: list.per_page from config)
        #[arg(long)]
        per_page: Option<u32>,

        /// Search term
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show one record
    Show {
        collection: String,
        id: String,
    },

    /// Create a record
    #[command(visible_alias = "add")]
    Create {
        collection: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Update a record
    #[command(visible_alias = "edit")]
    Update {
        collection: String,
        id: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a record
    Rm {
        collection: String,
        id: String,
    },

    /// List known collections and their fields
    Collections {
        /// Show the fields of one collection
        name: Option<String>,
    },

    /// Stock movements for product variations
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },

    /// Store a session token
    Login {
        /// Token; read from stdin when omitted
        token: Option<String>,
    },

    /// Forget the stored session token
    Logout,

    /// Show whether a session token is stored
    Token,

    /// Look up address parts
    Autofill {
        #[command(subcommand)]
        action: AutofillAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum StockAction {
    /// Record a stock movement
    Add {
        /// Variation id
        variation: String,

        /// Quantity moved (must be greater than 0)
        quantity: u64,

        /// Movement: in or out
        #[arg(short = 't', long = "type", default_value = "in", value_parser = parse_movement)]
        movement: Movement,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show the stock ledger of a variation
    Ls {
        /// Variation id
        variation: String,
    },
}

#[derive(Subcommand)]
pub enum AutofillAction {
    /// State and district for a 6-digit postal code
    Pincode { pincode: String },

    /// Address for a coordinate pair
    Geo {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Key, e.g. api.base_url
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key, e.g. list.per_page
        key: String,
        value: String,
    },
}

fn parse_movement(s: &str) -> Result<Movement, String> {
    s.parse().map_err(|e: crate::error::BackofficeError| e.to_string())
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "backoffice", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_fields() {
        let cli = Cli::try_parse_from([
            "backoffice",
            "create",
            "brands",
            "--set",
            "name=Acme",
            "-f",
            "logo=./logo.png",
            "--offline",
        ])
        .unwrap();
        assert!(cli.offline);
        let Commands::Create { collection, fields } = cli.command else {
            panic!("expected create");
        };
        assert_eq!(collection, "brands");
        assert_eq!(fields.set, vec!["name=Acme"]);
        assert_eq!(fields.files, vec!["logo=./logo.png"]);
    }

    #[test]
    fn test_stock_movement_parsing() {
        let cli =
            Cli::try_parse_from(["backoffice", "stock", "add", "4", "3", "--type", "OUT"]).unwrap();
        let Commands::Stock {
            action: StockAction::Add { movement, .. },
        } = cli.command
        else {
            panic!("expected stock add");
        };
        assert_eq!(movement, Movement::Out);

        assert!(Cli::try_parse_from(["backoffice", "stock", "add", "4", "3", "-t", "sideways"]).is_err());
    }
}
