use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations.
/// Creates the parent directory when it does not exist yet.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
            version: 0,
            reason: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;"
    )?;
    Ok(())
}

/// Run all pending migrations, then the archive-flag column check.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_referrals.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    ensure_is_archived_column(conn)?;

    Ok(())
}

/// One-time migration for tables created before archiving existed:
/// add `is_archived`, default it to false, backfill existing rows.
/// A no-op once the column is present.
pub fn ensure_is_archived_column(conn: &Connection) -> Result<(), DatabaseError> {
    if has_column(conn, "referrals", "is_archived")? {
        return Ok(());
    }

    let fail = |e: rusqlite::Error| DatabaseError::MigrationFailed {
        version: 2,
        reason: format!("is_archived: {e}"),
    };
    conn.execute_batch(
        "ALTER TABLE referrals ADD COLUMN is_archived INTEGER NOT NULL DEFAULT 0;",
    )
    .map_err(fail)?;
    let backfilled = conn
        .execute("UPDATE referrals SET is_archived = 0", [])
        .map_err(fail)?;
    conn.execute("INSERT OR IGNORE INTO schema_version (version) VALUES (2)", [])
        .map_err(fail)?;

    tracing::info!(backfilled, "Added is_archived column to referrals table");
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}
