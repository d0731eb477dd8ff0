use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::analyzer::distribution::{compute_satisfaction, SatisfactionStats};
use crate::db::queries;
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

pub(crate) fn run_satisfaction_logic(state: &AppState) -> Result<SatisfactionStats, AppError> {
    let scores = state.db(queries::fetch_satisfaction_scores)?;
    log::debug!("satisfaction: {} responses", scores.len());
    Ok(compute_satisfaction(&scores))
}

pub async fn satisfaction_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SatisfactionStats>, AppError> {
    state.run_blocking(run_satisfaction_logic).await.map(Json)
}
