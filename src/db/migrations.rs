use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::error::AppResult;

const USER_VERSION: i32 = 1;

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            1,
            "Add weekly reports with one report per user and week",
            Some("DROP TABLE IF EXISTS weekly_reports;"),
        )?;
    }

    if current_version != USER_VERSION {
        conn.execute(&format!("PRAGMA user_version = {}", USER_VERSION), [])?;
    }

    Ok(())
}

fn record_migration(
    conn: &Connection,
    version: i32,
    description: &str,
    rollback_sql: Option<&str>,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at, rollback_sql) VALUES (?, ?, ?, ?)",
        (version, description, now, rollback_sql),
    )?;
    Ok(())
}

pub fn get_migration_history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM migration_history ORDER BY version",
    )?;

    let migrations = stmt
        .query_map([], |row| {
            let applied_at_str: String = row.get(2)?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "applied_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);

            Ok(MigrationInfo {
                version: row.get(0)?,
                description: row.get(1)?,
                applied_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(migrations)
}

// week_start is stored as RFC 3339 UTC with millisecond precision, so the
// unique index also dedupes instants written by concurrent generators.
fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_reports (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            week_start TEXT NOT NULL,
            week_end TEXT NOT NULL,
            summary TEXT NOT NULL,
            strengths TEXT NOT NULL,
            improvements TEXT NOT NULL,
            suggestions TEXT NOT NULL,
            productivity_score REAL NOT NULL,
            total_focus_hours REAL NOT NULL,
            habits_completed INTEGER NOT NULL,
            tasks_completed INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, week_start)
        );
        CREATE INDEX IF NOT EXISTS idx_weekly_reports_user_created
            ON weekly_reports(user_id, created_at);
        "#,
    )?;

    Ok(())
}
