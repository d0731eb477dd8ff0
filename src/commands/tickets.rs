use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDateTime, Utc};

use crate::analyzer::distribution::{compute_status_distribution, StatusDistribution};
use crate::analyzer::efficiency::{compute_efficiency, EfficiencyReport, RESOLVED_SCAN_LIMIT};
use crate::analyzer::progress::{compute_ticket_trend, TicketTrend};
use crate::analyzer::Buckets;
use crate::db::queries::{self, TicketFilter};
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

use super::{load_config, ReportQuery};

const TREND_WINDOW_DAYS: i64 = 30;
const EFFICIENCY_WINDOW_DAYS: i64 = 30;

/// Status counts over all time unless the query bounds `created_at`.
pub(crate) fn run_status_logic(state: &AppState, query: &ReportQuery) -> Result<StatusDistribution, AppError> {
    let (from, to) = query.bounds();
    let project_id = query.project_id();
    let counts = state.db(|conn| queries::fetch_status_counts(conn, project_id, from, to))?;
    log::debug!("ticket status: {} distinct statuses", counts.len());
    Ok(compute_status_distribution(&counts))
}

pub(crate) fn run_trend_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<TicketTrend, AppError> {
    let start = Instant::now();
    let classifier = load_config(state)?.classifier();
    let range = query.window(TREND_WINDOW_DAYS, now);
    let buckets = Buckets::new(range.from, range.to, query.interval());
    let filter = TicketFilter::project(query.project_id());

    let (created, updated) = state.db(|conn| {
        Ok((
            queries::fetch_created_between(conn, range.from, range.to, &filter)?,
            queries::fetch_updated_between(conn, range.from, range.to, &filter, None)?,
        ))
    })?;
    log::debug!(
        "ticket trend {}..{} interval={} created={} updated={}",
        range.from,
        range.to,
        buckets.interval().as_str(),
        created.len(),
        updated.len()
    );

    let trend = compute_ticket_trend(&created, &updated, &buckets, &classifier);
    log::info!("ticket trend computed in {:?}", start.elapsed());
    Ok(trend)
}

pub(crate) fn run_efficiency_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<EfficiencyReport, AppError> {
    let start = Instant::now();
    let classifier = load_config(state)?.classifier();
    let range = query.window(EFFICIENCY_WINDOW_DAYS, now);
    let filter = TicketFilter::project(query.project_id());

    let (resolved, created) = state.db(|conn| {
        Ok((
            queries::fetch_updated_between(conn, range.from, range.to, &filter, Some(RESOLVED_SCAN_LIMIT))?,
            queries::fetch_created_between(conn, range.from, range.to, &filter)?,
        ))
    })?;
    log::debug!(
        "ticket efficiency {}..{} resolved={} created={}",
        range.from,
        range.to,
        resolved.len(),
        created.len()
    );

    let report = compute_efficiency(&resolved, &created, &classifier, now);
    log::info!("ticket efficiency computed in {:?}", start.elapsed());
    Ok(report)
}

pub async fn ticket_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<StatusDistribution>, AppError> {
    state
        .run_blocking(move |s| run_status_logic(s, &query))
        .await
        .map(Json)
}

pub async fn ticket_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TicketTrend>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_trend_logic(s, &query, now))
        .await
        .map(Json)
}

pub async fn ticket_efficiency(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<EfficiencyReport>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_efficiency_logic(s, &query, now))
        .await
        .map(Json)
}
