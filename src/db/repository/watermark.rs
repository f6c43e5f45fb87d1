use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;

use super::{format_timestamp, parse_timestamp};

/// Read the reporting watermark. The row is seeded by the initial
/// migration, so a missing row is a schema-level fault.
pub fn get(conn: &Connection) -> Result<NaiveDateTime, DatabaseError> {
    let raw: String = conn
        .query_row(
            "SELECT last_report_time FROM report_watermark WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .map_err(|_| DatabaseError::NotFound {
            entity_type: "report_watermark".into(),
            id: "1".into(),
        })?;
    parse_timestamp(&raw)
}

pub fn set(conn: &Connection, ts: NaiveDateTime) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE report_watermark SET last_report_time = ?1 WHERE id = 1",
        params![format_timestamp(ts)],
    )?;
    Ok(())
}
