use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::error::AppError;
use crate::export::sla_report;
use crate::state::AppState;

use super::sla::{run_sla_achievement_logic, DEFAULT_WINDOW_DAYS};
use super::ReportQuery;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub async fn export_sla_achievement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now().naive_utc();
    let range = query.window(DEFAULT_WINDOW_DAYS, now);
    let bytes = state
        .run_blocking(move |s| {
            let report = run_sla_achievement_logic(s, &query, now)?;
            sla_report::generate_sla_report(&report)
        })
        .await?;
    log::info!("SLA workbook exported ({} bytes)", bytes.len());

    let filename = format!(
        "attachment; filename=\"sla_achievement_{}_{}.xlsx\"",
        range.from.format("%Y%m%d"),
        range.to.format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        bytes,
    ))
}
