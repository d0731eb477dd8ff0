use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::config::{update_config_in_db, AppConfig};
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

use super::load_config;

pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<AppConfig>, AppError> {
    state.run_blocking(load_config).await.map(Json)
}

/// Validates before writing; returns the stored configuration.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<AppConfig>,
) -> Result<Json<AppConfig>, AppError> {
    config.validate()?;
    let stored = state
        .run_blocking(move |s| {
            s.db(|conn| update_config_in_db(conn, &config))?;
            load_config(s)
        })
        .await?;
    log::info!("Report configuration updated");
    Ok(Json(stored))
}
