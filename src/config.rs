use std::env;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::analyzer::classifier::DEFAULT_DONE_KEYWORDS;
use crate::analyzer::sla::RuleHours;
use crate::analyzer::{CompletionClassifier, SlaRuleSet};
use crate::error::AppError;

// ─── Report configuration (stored in SQLite) ─────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub sla_p1_hours: u32,
    pub sla_p2_hours: u32,
    pub sla_p3_hours: u32,
    pub sla_p4_hours: u32,
    pub sla_default_hours: u32,
    pub done_keywords: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let hours = RuleHours::default();
        AppConfig {
            sla_p1_hours: hours.p1,
            sla_p2_hours: hours.p2,
            sla_p3_hours: hours.p3,
            sla_p4_hours: hours.p4,
            sla_default_hours: hours.default_hours,
            done_keywords: DEFAULT_DONE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl AppConfig {
    pub fn rules(&self) -> SlaRuleSet {
        SlaRuleSet::from_hours(RuleHours {
            p1: self.sla_p1_hours,
            p2: self.sla_p2_hours,
            p3: self.sla_p3_hours,
            p4: self.sla_p4_hours,
            default_hours: self.sla_default_hours,
        })
    }

    pub fn classifier(&self) -> CompletionClassifier {
        CompletionClassifier::new(&self.done_keywords)
    }

    /// Rejects a keyword list that would classify nothing as done.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.done_keywords.is_empty() {
            return Err(AppError::Config("done_keywords must not be empty".into()));
        }
        if self.done_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(AppError::Config("done_keywords must not contain blank entries".into()));
        }
        Ok(())
    }
}

pub fn get_config_from_db(conn: &Connection) -> Result<AppConfig, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT key, value FROM config")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let defaults = AppConfig::default();
    let mut config = defaults.clone();

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            "sla_p1_hours" => config.sla_p1_hours = value.parse().unwrap_or(defaults.sla_p1_hours),
            "sla_p2_hours" => config.sla_p2_hours = value.parse().unwrap_or(defaults.sla_p2_hours),
            "sla_p3_hours" => config.sla_p3_hours = value.parse().unwrap_or(defaults.sla_p3_hours),
            "sla_p4_hours" => config.sla_p4_hours = value.parse().unwrap_or(defaults.sla_p4_hours),
            "sla_default_hours" => {
                config.sla_default_hours = value.parse().unwrap_or(defaults.sla_default_hours)
            }
            "done_keywords" => match serde_json::from_str::<Vec<String>>(&value) {
                Ok(v) if !v.is_empty() => config.done_keywords = v,
                _ => log::warn!("Ignoring unreadable done_keywords value"),
            },
            _ => {}
        }
    }

    Ok(config)
}

pub fn update_config_in_db(conn: &Connection, config: &AppConfig) -> Result<(), rusqlite::Error> {
    let pairs: Vec<(&str, String)> = vec![
        ("sla_p1_hours", config.sla_p1_hours.to_string()),
        ("sla_p2_hours", config.sla_p2_hours.to_string()),
        ("sla_p3_hours", config.sla_p3_hours.to_string()),
        ("sla_p4_hours", config.sla_p4_hours.to_string()),
        ("sla_default_hours", config.sla_default_hours.to_string()),
        (
            "done_keywords",
            serde_json::to_string(&config.done_keywords).unwrap_or_default(),
        ),
    ];

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
        )?;
        for (key, value) in pairs {
            stmt.execute(rusqlite::params![key, value])?;
        }
    }
    tx.commit()
}

// ─── Service configuration (environment) ─────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_path: get_var_or("DATABASE_PATH", "reports.db"),
            host: get_var_or("HOST", "0.0.0.0"),
            port: get_var_or("PORT", "8080")
                .parse()
                .map_err(|e| AppError::Config(format!("invalid PORT: {e}")))?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Installs the global subscriber; `RUST_LOG` wins over `LOG_LEVEL`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(true).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults_when_table_empty() {
        let conn = init_memory_db().unwrap();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.rules().resolve(Some("P1")), 4);
        assert!(config.classifier().is_done(Some("Closed")));
    }

    #[test]
    fn test_update_roundtrip_and_fallbacks() {
        let conn = init_memory_db().unwrap();
        let mut config = AppConfig::default();
        config.sla_p1_hours = 2;
        config.done_keywords = vec!["finished".into()];
        update_config_in_db(&conn, &config).unwrap();

        let loaded = get_config_from_db(&conn).unwrap();
        assert_eq!(loaded.sla_p1_hours, 2);
        assert_eq!(loaded.done_keywords, vec!["finished".to_string()]);
        assert!(!loaded.classifier().is_done(Some("closed")));

        conn.execute(
            "UPDATE config SET value = 'abc' WHERE key = 'sla_p2_hours'",
            [],
        )
        .unwrap();
        conn.execute(
            "UPDATE config SET value = 'not json' WHERE key = 'done_keywords'",
            [],
        )
        .unwrap();
        let loaded = get_config_from_db(&conn).unwrap();
        assert_eq!(loaded.sla_p2_hours, 8);
        assert_eq!(loaded.done_keywords, AppConfig::default().done_keywords);
    }

    #[test]
    fn test_failed_update_leaves_stored_config_untouched() {
        let conn = init_memory_db().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_p4 BEFORE INSERT ON config
             WHEN NEW.key = 'sla_p4_hours'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.sla_p1_hours = 2;
        assert!(update_config_in_db(&conn, &config).is_err());

        let stored: i64 = conn
            .query_row("SELECT COUNT(*) FROM config", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 0);
        assert_eq!(get_config_from_db(&conn).unwrap().sla_p1_hours, 4);
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.done_keywords = vec![];
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
        config.done_keywords = vec!["done".into(), "  ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_from_env() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("PORT", "9090");
        env::set_var("DATABASE_PATH", "/tmp/reports-test.db");
        let cfg = ServerConfig::from_env().unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.database_path, "/tmp/reports-test.db");

        env::set_var("PORT", "not-a-port");
        assert!(matches!(ServerConfig::from_env(), Err(AppError::Config(_))));

        env::remove_var("PORT");
        env::remove_var("DATABASE_PATH");
    }

    #[test]
    fn test_bind_addr() {
        let cfg = ServerConfig {
            database_path: String::new(),
            host: "127.0.0.1".to_owned(),
            port: 3000,
            log_level: "debug".to_owned(),
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }
}
