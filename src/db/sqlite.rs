use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing and composition-time swap).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> =
        vec![(1, include_str!("migrations/001_initial.sql"))];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Count tables in the database (for verification).
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + payments + residents + report_watermark = 4
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 4, "Expected 4 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn residents_seeded_for_every_valid_unit() {
        let conn = open_memory_database().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM residents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 165);

        // Zero-padded low units, unpadded three-digit units.
        for unit in ["88/01", "88/09", "88/10", "88/99", "88/100", "88/165"] {
            let found: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM residents WHERE unit_id = ?1",
                    [unit],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "Missing seeded unit {unit}");
        }
    }

    #[test]
    fn seeded_balances_start_at_zero() {
        let conn = open_memory_database().unwrap();
        let nonzero: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM residents WHERE balance != 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nonzero, 0);
    }

    #[test]
    fn watermark_singleton_initialized() {
        let conn = open_memory_database().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM report_watermark", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);

        // The CHECK constraint forbids a second row.
        let second = conn.execute(
            "INSERT INTO report_watermark (id, last_report_time) VALUES (2, '2025-01-01 00:00:00')",
            [],
        );
        assert!(second.is_err());
    }

    #[test]
    fn status_check_constraint_rejects_unknown_status() {
        let conn = open_memory_database().unwrap();
        let result = conn.execute(
            "INSERT INTO payments (id, sender_id, evidence_reference, raw_text, status, submitted_at)
             VALUES ('p1', 'U1', 'ref.jpg', '', 'approved', '2025-01-01 00:00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extenso.db");
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 4);
        drop(conn);

        // Re-open; migrations must not re-seed.
        let conn2 = open_database(&path).unwrap();
        let count: i64 = conn2
            .query_row("SELECT COUNT(*) FROM residents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 165);
    }
}
