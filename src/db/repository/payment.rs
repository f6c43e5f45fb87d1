use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{PaymentStatus, PaymentSubmission};

use super::{format_timestamp, parse_timestamp};

const COLUMNS: &str = "id, sender_id, unit_id, fee_period, amount, \
     transaction_reference, payer_name, contact_email, evidence_reference, \
     raw_text, status, submitted_at, resolved_by, resolved_at";

/// Raw column values before enum/timestamp decoding.
struct PaymentRow {
    id: String,
    sender_id: String,
    unit_id: Option<String>,
    fee_period: Option<String>,
    amount: Option<i64>,
    transaction_reference: Option<String>,
    payer_name: Option<String>,
    contact_email: Option<String>,
    evidence_reference: String,
    raw_text: String,
    status: String,
    submitted_at: String,
    resolved_by: Option<String>,
    resolved_at: Option<String>,
}

impl PaymentRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            unit_id: row.get(2)?,
            fee_period: row.get(3)?,
            amount: row.get(4)?,
            transaction_reference: row.get(5)?,
            payer_name: row.get(6)?,
            contact_email: row.get(7)?,
            evidence_reference: row.get(8)?,
            raw_text: row.get(9)?,
            status: row.get(10)?,
            submitted_at: row.get(11)?,
            resolved_by: row.get(12)?,
            resolved_at: row.get(13)?,
        })
    }

    fn into_submission(self) -> Result<PaymentSubmission, DatabaseError> {
        Ok(PaymentSubmission {
            id: Uuid::parse_str(&self.id).map_err(|_| DatabaseError::InvalidEnum {
                field: "id".into(),
                value: self.id.clone(),
            })?,
            sender_id: self.sender_id,
            unit_id: self.unit_id,
            fee_period: self.fee_period,
            amount: self.amount,
            transaction_reference: self.transaction_reference,
            payer_name: self.payer_name,
            contact_email: self.contact_email,
            evidence_reference: self.evidence_reference,
            raw_text: self.raw_text,
            status: PaymentStatus::from_str(&self.status)?,
            submitted_at: parse_timestamp(&self.submitted_at)?,
            resolved_by: self.resolved_by,
            resolved_at: self.resolved_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

pub fn insert(conn: &Connection, sub: &PaymentSubmission) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payments (id, sender_id, unit_id, fee_period, amount, \
         transaction_reference, payer_name, contact_email, evidence_reference, \
         raw_text, status, submitted_at, resolved_by, resolved_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            sub.id.to_string(),
            sub.sender_id,
            sub.unit_id,
            sub.fee_period,
            sub.amount,
            sub.transaction_reference,
            sub.payer_name,
            sub.contact_email,
            sub.evidence_reference,
            sub.raw_text,
            sub.status.as_str(),
            format_timestamp(sub.submitted_at),
            sub.resolved_by,
            sub.resolved_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: Uuid) -> Result<Option<PaymentSubmission>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM payments WHERE id = ?1"),
            [id.to_string()],
            PaymentRow::from_row,
        )
        .optional()?;
    row.map(PaymentRow::into_submission).transpose()
}

/// All submissions with the given status, oldest first.
pub fn list_by_status(
    conn: &Connection,
    status: PaymentStatus,
) -> Result<Vec<PaymentSubmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM payments WHERE status = ?1 ORDER BY submitted_at ASC"
    ))?;
    let rows = stmt.query_map([status.as_str()], PaymentRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_submission()?);
    }
    Ok(out)
}

/// Submissions in any of the given statuses submitted strictly after
/// `since`, oldest first. Strict comparison keeps a row that sits exactly
/// on a watermark out of the next window.
pub fn list_submitted_since(
    conn: &Connection,
    statuses: &[PaymentStatus],
    since: NaiveDateTime,
) -> Result<Vec<PaymentSubmission>, DatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = statuses
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {COLUMNS} FROM payments \
         WHERE submitted_at > ?1 AND status IN ({placeholders}) \
         ORDER BY submitted_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut bind: Vec<String> = vec![format_timestamp(since)];
    bind.extend(statuses.iter().map(|s| s.as_str().to_string()));
    let rows = stmt.query_map(rusqlite::params_from_iter(bind), PaymentRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_submission()?);
    }
    Ok(out)
}

/// Compare-and-set resolution. The WHERE clause only matches rows still
/// pending, so a concurrent second decision affects zero rows.
pub fn resolve_if_pending(
    conn: &Connection,
    id: Uuid,
    new_status: PaymentStatus,
    resolved_by: &str,
    resolved_at: NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE payments SET status = ?1, resolved_by = ?2, resolved_at = ?3 \
         WHERE id = ?4 AND status = ?5",
        params![
            new_status.as_str(),
            resolved_by,
            format_timestamp(resolved_at),
            id.to_string(),
            PaymentStatus::PendingReview.as_str(),
        ],
    )?;
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample(status: PaymentStatus) -> PaymentSubmission {
        PaymentSubmission {
            id: Uuid::new_v4(),
            sender_id: "U123".into(),
            unit_id: Some("88/07".into()),
            fee_period: Some("2025-11".into()),
            amount: Some(150_000),
            transaction_reference: Some("ABC123".into()),
            payer_name: Some("Somsak Wong".into()),
            contact_email: Some("owner@x.com".into()),
            evidence_reference: "88-07_x.jpg".into(),
            raw_text: "Total 1,500.00 Baht".into(),
            status,
            submitted_at: chrono::Utc::now().naive_utc(),
            resolved_by: None,
            resolved_at: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let sub = sample(PaymentStatus::PendingReview);
        insert(&conn, &sub).unwrap();

        let loaded = get_by_id(&conn, sub.id).unwrap().unwrap();
        assert_eq!(loaded.id, sub.id);
        assert_eq!(loaded.unit_id.as_deref(), Some("88/07"));
        assert_eq!(loaded.amount, Some(150_000));
        assert_eq!(loaded.status, PaymentStatus::PendingReview);
        assert_eq!(loaded.submitted_at, sub.submitted_at);
    }

    #[test]
    fn get_unknown_id_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_by_id(&conn, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_by_status_is_fifo() {
        let conn = open_memory_database().unwrap();
        let base = chrono::Utc::now().naive_utc();
        let mut older = sample(PaymentStatus::PendingReview);
        older.submitted_at = base - chrono::Duration::minutes(5);
        let newer = sample(PaymentStatus::PendingReview);
        insert(&conn, &newer).unwrap();
        insert(&conn, &older).unwrap();

        let pending = list_by_status(&conn, PaymentStatus::PendingReview).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, older.id);
        assert_eq!(pending[1].id, newer.id);
    }

    #[test]
    fn resolve_is_compare_and_set() {
        let conn = open_memory_database().unwrap();
        let sub = sample(PaymentStatus::PendingReview);
        insert(&conn, &sub).unwrap();
        let now = chrono::Utc::now().naive_utc();

        let first =
            resolve_if_pending(&conn, sub.id, PaymentStatus::Verified, "admin1", now).unwrap();
        assert_eq!(first, 1);

        let second =
            resolve_if_pending(&conn, sub.id, PaymentStatus::Rejected, "admin2", now).unwrap();
        assert_eq!(second, 0, "second resolution must not match");

        let loaded = get_by_id(&conn, sub.id).unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Verified);
        assert_eq!(loaded.resolved_by.as_deref(), Some("admin1"));
    }

    #[test]
    fn submitted_since_is_strict_and_filters_status() {
        let conn = open_memory_database().unwrap();
        let cutoff = chrono::Utc::now().naive_utc();

        let mut at_cutoff = sample(PaymentStatus::Completed);
        at_cutoff.submitted_at = cutoff;
        let mut after = sample(PaymentStatus::Completed);
        after.submitted_at = cutoff + chrono::Duration::seconds(1);
        let mut pending = sample(PaymentStatus::PendingReview);
        pending.submitted_at = cutoff + chrono::Duration::seconds(2);
        insert(&conn, &at_cutoff).unwrap();
        insert(&conn, &after).unwrap();
        insert(&conn, &pending).unwrap();

        let hits = list_submitted_since(
            &conn,
            &[PaymentStatus::Verified, PaymentStatus::Completed],
            cutoff,
        )
        .unwrap();
        // Exactly at the cutoff is excluded; pending is filtered out.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, after.id);
    }

    #[test]
    fn submitted_since_sees_late_verification_of_a_recent_row() {
        let conn = open_memory_database().unwrap();
        let cutoff = chrono::Utc::now().naive_utc();

        // Submitted inside the window, verified later.
        let mut sub = sample(PaymentStatus::PendingReview);
        sub.submitted_at = cutoff + chrono::Duration::seconds(5);
        insert(&conn, &sub).unwrap();
        resolve_if_pending(
            &conn,
            sub.id,
            PaymentStatus::Verified,
            "admin1",
            cutoff + chrono::Duration::minutes(10),
        )
        .unwrap();

        let hits =
            list_submitted_since(&conn, &[PaymentStatus::Verified], cutoff).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, sub.id);
    }
}
