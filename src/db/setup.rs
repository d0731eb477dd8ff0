use rusqlite::Connection;

use super::migrations::run_migrations;

const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = -64000;
    PRAGMA busy_timeout = 5000;
    PRAGMA temp_store = MEMORY;
    PRAGMA mmap_size = 268435456;
";

/// Opens (or creates) the report store at `path` and brings its schema up to date.
pub fn init_db(path: &str) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.execute_batch(PRAGMAS)?;
    run_migrations(&conn)?;
    log::info!("Report store ready at {}", path);
    Ok(conn)
}

/// Migrated in-memory store, for tests and dry runs.
pub fn init_memory_db() -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_on_disk_is_idempotent() {
        let path = std::env::temp_dir().join(format!("cusdesk-reports-{}.db", std::process::id()));
        let path_str = path.to_str().unwrap().to_string();

        let conn = init_db(&path_str).unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('sla_p1_hours', '6')",
            [],
        )
        .unwrap();
        drop(conn);

        let conn = init_db(&path_str).unwrap();
        let value: String = conn
            .query_row("SELECT value FROM config WHERE key = 'sla_p1_hours'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(value, "6");
        drop(conn);

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path_str, suffix));
        }
    }
}
