use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDateTime, Utc};

use crate::analyzer::progress::{compute_project_progress, ProjectProgress};
use crate::analyzer::rollup::{
    compute_category_rollup, compute_projects_overview, CategoryReport, ProjectsOverview,
};
use crate::analyzer::Buckets;
use crate::db::queries::{self, TicketFilter};
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

use super::{load_config, ReportQuery};

const OVERVIEW_WINDOW_DAYS: i64 = 90;
const PROGRESS_WINDOW_DAYS: i64 = 60;
const CATEGORY_WINDOW_DAYS: i64 = 60;

pub(crate) fn run_overview_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<ProjectsOverview, AppError> {
    let start = Instant::now();
    let classifier = load_config(state)?.classifier();
    let range = query.window(OVERVIEW_WINDOW_DAYS, now);
    let statuses = query.statuses();
    let keyword = query.keyword();
    let all = TicketFilter::default();

    let (projects, created, updated, current) = state.db(|conn| {
        let projects = queries::fetch_projects(conn, &statuses, keyword)?;
        if projects.is_empty() {
            return Ok((projects, Vec::new(), Vec::new(), Vec::new()));
        }
        Ok((
            projects,
            queries::fetch_created_between(conn, range.from, range.to, &all)?,
            queries::fetch_updated_between(conn, range.from, range.to, &all, None)?,
            queries::fetch_current(conn, &all)?,
        ))
    })?;
    log::debug!(
        "projects overview {}..{} projects={} created={} updated={} current={}",
        range.from,
        range.to,
        projects.len(),
        created.len(),
        updated.len(),
        current.len()
    );

    let overview = compute_projects_overview(&projects, &created, &updated, &current, range, &classifier);
    log::info!("projects overview computed in {:?}", start.elapsed());
    Ok(overview)
}

/// Empty payload when no project is selected.
pub(crate) fn run_progress_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<ProjectProgress, AppError> {
    let project_id = match query.project_id() {
        Some(id) => id,
        None => return Ok(ProjectProgress::default()),
    };

    let start = Instant::now();
    let classifier = load_config(state)?.classifier();
    let range = query.window(PROGRESS_WINDOW_DAYS, now);
    let buckets = Buckets::new(range.from, range.to, query.interval());

    let tickets = state.db(|conn| queries::fetch_current(conn, &TicketFilter::project(Some(project_id))))?;
    log::debug!(
        "project {} progress {}..{} interval={} tickets={}",
        project_id,
        range.from,
        range.to,
        buckets.interval().as_str(),
        tickets.len()
    );

    let progress = compute_project_progress(&tickets, range, &buckets, &classifier, now);
    log::info!("project progress computed in {:?}", start.elapsed());
    Ok(progress)
}

pub(crate) fn run_category_logic(
    state: &AppState,
    query: &ReportQuery,
    now: NaiveDateTime,
) -> Result<CategoryReport, AppError> {
    let start = Instant::now();
    let classifier = load_config(state)?.classifier();
    let range = query.window(CATEGORY_WINDOW_DAYS, now);
    let filter = TicketFilter {
        project_id: query.project_id(),
        type_group: query.type_group(),
    };

    let (samples, names) = state.db(|conn| {
        Ok((
            queries::fetch_created_between(conn, range.from, range.to, &filter)?,
            queries::fetch_category_names(conn)?,
        ))
    })?;
    log::debug!(
        "category rollup {}..{} samples={} categories={}",
        range.from,
        range.to,
        samples.len(),
        names.len()
    );

    let report = compute_category_rollup(&samples, &names, range.to, &classifier);
    log::info!("category rollup computed in {:?}", start.elapsed());
    Ok(report)
}

pub async fn projects_overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ProjectsOverview>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_overview_logic(s, &query, now))
        .await
        .map(Json)
}

pub async fn project_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ProjectProgress>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_progress_logic(s, &query, now))
        .await
        .map(Json)
}

pub async fn project_category(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CategoryReport>, AppError> {
    let now = Utc::now().naive_utc();
    state
        .run_blocking(move |s| run_category_logic(s, &query, now))
        .await
        .map(Json)
}
