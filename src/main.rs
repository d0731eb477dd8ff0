use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cusdesk_reports::config::{init_tracing, ServerConfig};
use cusdesk_reports::error::AppError;
use cusdesk_reports::{db, import_tickets, serve};

#[derive(Parser)]
#[command(name = "cusdesk-reports")]
#[command(version)]
#[command(about = "SLA and ticket reporting service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the report API (default)
    Serve,
    /// Load a ticket CSV export into the store
    Import {
        /// Path to the CSV file
        path: String,

        /// Field delimiter
        #[arg(long, short, default_value_t = ',')]
        delimiter: char,
    },
}

async fn run(cli: Cli, config: ServerConfig) -> Result<(), AppError> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config).await,
        Commands::Import { path, delimiter } => {
            if !delimiter.is_ascii() {
                return Err(AppError::Config(format!("delimiter must be ASCII: {:?}", delimiter)));
            }
            let mut conn = db::init_db(&config.database_path)?;
            let result = import_tickets(&mut conn, &path, delimiter as u8)?;
            for w in &result.warnings {
                tracing::warn!(line = w.line, "{}", w.message);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);
    tracing::info!(service = "cusdesk-reports", db = %config.database_path, "starting");

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
