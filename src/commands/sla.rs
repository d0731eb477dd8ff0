use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDateTime, Utc};

use crate::analyzer::{
    compute_achievement, compute_overdue, AchievementReport, Buckets, OverdueReport,
};
use crate::db::queries::{self, TicketFilter};
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

use super::{load_config, ReportQuery};

pub(crate) const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Shared achievement computation, used by the JSON route and the XLSX export.
pub(crate) fn run_sla_achievement_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<AchievementReport, AppError> {
    let start = Instant::now();
    let config = load_config(state)?;
    let rules = config.rules().with_overrides(&query.overrides());
    let classifier = config.classifier();
    let range = query.window(DEFAULT_WINDOW_DAYS, now);
    let buckets = Buckets::new(range.from, range.to, query.interval());
    let filter = TicketFilter::project(query.project_id());

    let samples = state.db(|conn| queries::fetch_created_between(conn, range.from, range.to, &filter))?;
    log::debug!(
        "sla achievement {}..{} interval={} samples={}",
        range.from,
        range.to,
        buckets.interval().as_str(),
        samples.len()
    );

    let report = compute_achievement(&samples, &rules, &buckets, &classifier, now);
    log::info!("sla achievement computed in {:?}", start.elapsed());
    Ok(report)
}

pub(crate) fn run_sla_overdue_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<OverdueReport, AppError> {
    let start = Instant::now();
    let config = load_config(state)?;
    let rules = config.rules().with_overrides(&query.overrides());
    let classifier = config.classifier();
    let range = query.window(DEFAULT_WINDOW_DAYS, now);
    let buckets = Buckets::new(range.from, range.to, query.interval());
    let filter = TicketFilter::project(query.project_id());

    let samples = state.db(|conn| queries::fetch_created_between(conn, range.from, range.to, &filter))?;
    log::debug!(
        "sla overdue {}..{} interval={} samples={}",
        range.from,
        range.to,
        buckets.interval().as_str(),
        samples.len()
    );

    let report = compute_overdue(&samples, &rules, &buckets, &classifier, now);
    log::info!("sla overdue computed in {:?}", start.elapsed());
    Ok(report)
}

pub async fn sla_achievement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AchievementReport>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_sla_achievement_logic(s, &query, now))
        .await
        .map(Json)
}

pub async fn sla_overdue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<OverdueReport>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_sla_overdue_logic(s, &query, now))
        .await
        .map(Json)
}
