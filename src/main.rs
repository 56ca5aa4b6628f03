use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use backoffice::cli::{
    AutofillAction, Cli, Commands, ConfigAction, OutputOptions, StockAction, generate_completions,
};
use backoffice::commands::{
    cmd_autofill_geo, cmd_autofill_pincode, cmd_collections, cmd_config_get, cmd_config_set,
    cmd_config_show, cmd_create, cmd_login, cmd_logout, cmd_ls, cmd_rm, cmd_show, cmd_stock_add,
    cmd_stock_ls, cmd_token, cmd_update,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let output = OutputOptions { json: cli.json };
    let offline = cli.offline;

    let result = match cli.command {
        Commands::Ls {
            collection,
            page,
            per_page,
            search,
        } => cmd_ls(&collection, page, per_page, search.as_deref(), offline, output).await,
        Commands::Show { collection, id } => cmd_show(&collection, &id, offline, output).await,
        Commands::Create { collection, fields } => {
            cmd_create(&collection, &fields, offline, output).await
        }
        Commands::Update {
            collection,
            id,
            fields,
        } => cmd_update(&collection, &id, &fields, offline, output).await,
        Commands::Rm { collection, id } => cmd_rm(&collection, &id, offline, output).await,
        Commands::Collections { name } => cmd_collections(name.as_deref(), output),

        Commands::Stock { action } => match action {
            StockAction::Add {
                variation,
                quantity,
                movement,
                note,
            } => {
                cmd_stock_add(
                    &variation,
                    quantity,
                    movement,
                    note.as_deref(),
                    offline,
                    output,
                )
                .await
            }
            StockAction::Ls { variation } => cmd_stock_ls(&variation, offline, output).await,
        },

        Commands::Login { token } => cmd_login(token.as_deref(), output),
        Commands::Logout => cmd_logout(output),
        Commands::Token => cmd_token(output),

        Commands::Autofill { action } => match action {
            AutofillAction::Pincode { pincode } => cmd_autofill_pincode(&pincode, output).await,
            AutofillAction::Geo {
                latitude,
                longitude,
            } => cmd_autofill_geo(latitude, longitude, output).await,
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(output),
            ConfigAction::Get { key } => cmd_config_get(&key, output),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value, output),
        },

        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
