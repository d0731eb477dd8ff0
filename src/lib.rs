pub mod analyzer;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod parser;
pub mod state;

use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;
use axum::Router;
use rusqlite::Connection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use error::AppError;
use parser::ImportResult;
use state::AppState;

/// Report routes with CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers(Any);

    commands::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Opens the store and serves the report API until the process is stopped.
pub async fn serve(config: &ServerConfig) -> Result<(), AppError> {
    let conn = db::init_db(&config.database_path)?;
    let app = build_router(Arc::new(AppState::new(conn)));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Loads a ticket CSV export into the store, upserting by id.
pub fn import_tickets(
    conn: &mut Connection,
    csv_path: &str,
    delimiter: u8,
) -> Result<ImportResult, AppError> {
    let start = Instant::now();
    let output = parser::parse_csv(csv_path, delimiter)?;
    let imported = db::insert::bulk_insert_tickets(conn, &output.tickets)?;
    log::info!(
        "Imported {} tickets from {} ({} rows skipped)",
        imported,
        csv_path,
        output.skipped_rows
    );

    Ok(ImportResult {
        imported,
        skipped_rows: output.skipped_rows,
        warnings: output.warnings,
        missing_optional_columns: output.missing_optional_columns,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

// ─── E2E Integration Tests ──────────────────────────────────────────────────
