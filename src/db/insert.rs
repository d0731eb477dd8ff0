use rusqlite::Connection;

#[cfg(test)]
use crate::analyzer::rollup::ProjectInfo;
use crate::analyzer::sample::TicketSample;

#[cfg(test)]
use super::queries::TicketCategory;

/// Upserts tickets by id inside one transaction.
pub fn bulk_insert_tickets(
    conn: &mut Connection,
    tickets: &[TicketSample],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO tickets (
                id, code, name, priority, status,
                project_id, category_id, created_at, updated_at, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
        )?;

        for t in tickets {
            stmt.execute(rusqlite::params![
                t.id,
                t.code,
                t.name,
                t.priority,
                t.status,
                t.project_id,
                t.category_id,
                t.created_at,
                t.updated_at,
            ])?;
        }
    }

    tx.commit()?;
    Ok(tickets.len())
}

// Projects, ticket types and survey responses are written by the helpdesk
// application that owns the store; the seeders below only serve tests.

#[cfg(test)]
pub(crate) fn insert_projects(
    conn: &mut Connection,
    projects: &[ProjectInfo],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO projects (id, code, name, status, start_date, end_date, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        )?;
        for p in projects {
            stmt.execute(rusqlite::params![
                p.id,
                p.code,
                p.name,
                p.status,
                p.start_date,
                p.end_date,
            ])?;
        }
    }

    tx.commit()?;
    Ok(projects.len())
}

#[cfg(test)]
pub(crate) fn insert_ticket_types(
    conn: &mut Connection,
    types: &[TicketCategory],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO ticket_types (id, type_group, name) VALUES (?1, ?2, ?3)",
        )?;
        for t in types {
            stmt.execute(rusqlite::params![t.id, t.type_group, t.name])?;
        }
    }

    tx.commit()?;
    Ok(types.len())
}

/// Records survey responses as `(ticket_id, overall_score)`.
#[cfg(test)]
pub(crate) fn insert_sat_responses(
    conn: &mut Connection,
    responses: &[(Option<i64>, Option<i64>)],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO sat_responses (ticket_id, overall_score) VALUES (?1, ?2)",
        )?;
        for (ticket_id, score) in responses {
            stmt.execute(rusqlite::params![ticket_id, score])?;
        }
    }

    tx.commit()?;
    Ok(responses.len())
}
