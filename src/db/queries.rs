use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params_from_iter, types::Value, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::analyzer::rollup::ProjectInfo;
use crate::analyzer::sample::TicketSample;

/// Optional narrowing applied to every ticket query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub project_id: Option<i64>,
    pub type_group: Option<String>,
}

impl TicketFilter {
    pub fn project(project_id: Option<i64>) -> Self {
        TicketFilter {
            project_id,
            type_group: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCategory {
    pub id: i64,
    pub type_group: Option<String>,
    pub name: String,
}

// ─── Private helpers ─────────────────────────────────────────────────────────

const TICKET_SELECT: &str = "SELECT t.id, t.code, t.name, t.priority, t.status,
        t.created_at, t.updated_at, t.project_id, t.category_id
     FROM tickets t
     LEFT JOIN ticket_types ty ON ty.id = t.category_id
     WHERE t.active = 1";

fn ts_value(ts: NaiveDateTime) -> Value {
    Value::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
}

fn row_to_sample(row: &Row<'_>) -> Result<TicketSample, rusqlite::Error> {
    Ok(TicketSample {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        priority: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        project_id: row.get(7)?,
        category_id: row.get(8)?,
    })
}

/// Appends the filter's conditions; placeholders are numbered from
/// `params.len()` after each push.
fn apply_filters(sql: &mut String, params: &mut Vec<Value>, filter: &TicketFilter) {
    if let Some(project_id) = filter.project_id {
        params.push(Value::Integer(project_id));
        sql.push_str(&format!(" AND t.project_id = ?{}", params.len()));
    }
    if let Some(group) = &filter.type_group {
        params.push(Value::Text(group.clone()));
        sql.push_str(&format!(" AND ty.type_group = ?{}", params.len()));
    }
}

fn push_range(sql: &mut String, params: &mut Vec<Value>, column: &str, from: NaiveDateTime, to: NaiveDateTime) {
    params.push(ts_value(from));
    sql.push_str(&format!(" AND {} >= ?{}", column, params.len()));
    params.push(ts_value(to));
    sql.push_str(&format!(" AND {} <= ?{}", column, params.len()));
}

fn query_samples(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<TicketSample>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), row_to_sample)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ─── Public queries ──────────────────────────────────────────────────────────

/// Tickets created in `[from, to]`, oldest first.
pub fn fetch_created_between(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
    filter: &TicketFilter,
) -> Result<Vec<TicketSample>, rusqlite::Error> {
    let mut sql = TICKET_SELECT.to_string();
    let mut params = Vec::new();
    push_range(&mut sql, &mut params, "t.created_at", from, to);
    apply_filters(&mut sql, &mut params, filter);
    sql.push_str(" ORDER BY t.created_at ASC, t.id ASC");
    query_samples(conn, &sql, params)
}

/// Tickets whose `updated_at` falls in `[from, to]`, most recent first.
pub fn fetch_updated_between(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
    filter: &TicketFilter,
    limit: Option<usize>,
) -> Result<Vec<TicketSample>, rusqlite::Error> {
    let mut sql = TICKET_SELECT.to_string();
    let mut params = Vec::new();
    push_range(&mut sql, &mut params, "t.updated_at", from, to);
    apply_filters(&mut sql, &mut params, filter);
    sql.push_str(" ORDER BY t.updated_at DESC, t.id DESC");
    if let Some(limit) = limit {
        params.push(Value::Integer(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", params.len()));
    }
    query_samples(conn, &sql, params)
}

/// Every active ticket regardless of creation date; open/closed is decided
/// by the caller's classifier.
pub fn fetch_current(conn: &Connection, filter: &TicketFilter) -> Result<Vec<TicketSample>, rusqlite::Error> {
    let mut sql = TICKET_SELECT.to_string();
    let mut params = Vec::new();
    apply_filters(&mut sql, &mut params, filter);
    sql.push_str(" ORDER BY t.created_at ASC, t.id ASC");
    query_samples(conn, &sql, params)
}

/// Active projects, optionally restricted to `statuses` and to a keyword
/// matched against name or code. Sorted by name.
pub fn fetch_projects(
    conn: &Connection,
    statuses: &[String],
    keyword: Option<&str>,
) -> Result<Vec<ProjectInfo>, rusqlite::Error> {
    let mut sql = String::from(
        "SELECT id, code, name, status, start_date, end_date FROM projects WHERE active = 1",
    );
    let mut params: Vec<Value> = Vec::new();

    if !statuses.is_empty() {
        let mut placeholders = Vec::with_capacity(statuses.len());
        for s in statuses {
            params.push(Value::Text(s.clone()));
            placeholders.push(format!("?{}", params.len()));
        }
        sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
    }
    if let Some(kw) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        params.push(Value::Text(format!("%{}%", kw)));
        let n = params.len();
        sql.push_str(&format!(" AND (name LIKE ?{n} OR code LIKE ?{n})"));
    }
    sql.push_str(" ORDER BY name ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(ProjectInfo {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
                status: row.get(3)?,
                start_date: row.get(4)?,
                end_date: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_category_names(conn: &Connection) -> Result<HashMap<i64, String>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM ticket_types")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

/// Ticket count per raw status, optionally bounded on `created_at`.
pub fn fetch_status_counts(
    conn: &Connection,
    project_id: Option<i64>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Result<Vec<(Option<String>, usize)>, rusqlite::Error> {
    let mut sql = String::from("SELECT t.status, COUNT(*) AS cnt FROM tickets t WHERE t.active = 1");
    let mut params: Vec<Value> = Vec::new();
    if let Some(pid) = project_id {
        params.push(Value::Integer(pid));
        sql.push_str(&format!(" AND t.project_id = ?{}", params.len()));
    }
    if let Some(from) = from {
        params.push(ts_value(from));
        sql.push_str(&format!(" AND t.created_at >= ?{}", params.len()));
    }
    if let Some(to) = to {
        params.push(ts_value(to));
        sql.push_str(&format!(" AND t.created_at <= ?{}", params.len()));
    }
    sql.push_str(" GROUP BY t.status ORDER BY cnt DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)? as usize))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_satisfaction_scores(conn: &Connection) -> Result<Vec<Option<i64>>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT overall_score FROM sat_responses")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, Option<i64>>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
