//! Row-level access to the ledger tables. Free functions over a borrowed
//! connection; transaction scope is owned by the caller.

pub mod payment;
pub mod resident;
pub mod watermark;

use chrono::NaiveDateTime;

use super::DatabaseError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Render a timestamp for storage. Microsecond precision keeps the strict
/// `>` comparison in the reporting window meaningful.
pub(crate) fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp, tolerating rows written without a fractional
/// part (the seeded watermark uses SQLite's own strftime).
pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .map_err(|_| {
            DatabaseError::ConstraintViolation(format!("unparseable timestamp: {raw}"))
        })
}
