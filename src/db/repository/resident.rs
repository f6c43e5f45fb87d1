use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::ResidentAccount;

use super::{format_timestamp, parse_timestamp};

struct ResidentRow {
    unit_id: String,
    balance: i64,
    last_payment_at: Option<String>,
}

impl ResidentRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            unit_id: row.get(0)?,
            balance: row.get(1)?,
            last_payment_at: row.get(2)?,
        })
    }

    fn into_account(self) -> Result<ResidentAccount, DatabaseError> {
        Ok(ResidentAccount {
            unit_id: self.unit_id,
            balance: self.balance,
            last_payment_at: self
                .last_payment_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

pub fn get(conn: &Connection, unit_id: &str) -> Result<Option<ResidentAccount>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT unit_id, balance, last_payment_at FROM residents WHERE unit_id = ?1",
            [unit_id],
            ResidentRow::from_row,
        )
        .optional()?;
    row.map(ResidentRow::into_account).transpose()
}

/// Add `amount` minor units to the unit's balance. Returns the number of
/// rows touched; zero means the unit has no seeded account.
pub fn credit(
    conn: &Connection,
    unit_id: &str,
    amount: i64,
    paid_at: NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE residents SET balance = balance + ?1, last_payment_at = ?2 \
         WHERE unit_id = ?3",
        params![amount, format_timestamp(paid_at), unit_id],
    )?;
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn seeded_account_reads_back() {
        let conn = open_memory_database().unwrap();
        let account = get(&conn, "88/07").unwrap().unwrap();
        assert_eq!(account.unit_id, "88/07");
        assert_eq!(account.balance, 0);
        assert!(account.last_payment_at.is_none());
    }

    #[test]
    fn unknown_unit_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get(&conn, "88/166").unwrap().is_none());
        assert!(get(&conn, "99/01").unwrap().is_none());
    }

    #[test]
    fn credit_accumulates_and_stamps_last_payment() {
        let conn = open_memory_database().unwrap();
        let now = chrono::Utc::now().naive_utc();
        assert_eq!(credit(&conn, "88/07", 150_000, now).unwrap(), 1);
        assert_eq!(credit(&conn, "88/07", 50_000, now).unwrap(), 1);

        let account = get(&conn, "88/07").unwrap().unwrap();
        assert_eq!(account.balance, 200_000);
        assert_eq!(account.last_payment_at, Some(now));
    }

    #[test]
    fn credit_unknown_unit_touches_nothing() {
        let conn = open_memory_database().unwrap();
        let now = chrono::Utc::now().naive_utc();
        assert_eq!(credit(&conn, "88/999", 100, now).unwrap(), 0);
    }
}
