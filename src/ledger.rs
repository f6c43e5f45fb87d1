//! Durable store for payment submissions and resident balances.
//!
//! All mutation goes through a single connection behind a mutex, and every
//! multi-step mutation runs in one SQLite transaction. The two invariants
//! this module owns: a submission leaves `PendingReview` at most once, and
//! a resident balance is credited exactly once per accepted payment.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{payment, resident, watermark};
use crate::db::{open_database, open_memory_database, DatabaseError};
use crate::models::{Decision, NewSubmission, PaymentStatus, PaymentSubmission, ResidentAccount};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Submission {id} already resolved as {status}")]
    AlreadyResolved { id: Uuid, status: PaymentStatus },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, LedgerError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| {
            LedgerError::Database(DatabaseError::ConstraintViolation(
                "connection lock poisoned".into(),
            ))
        })
    }

    /// Record a new submission. When it arrives already classified as
    /// `Completed`, the resident balance is credited in the same
    /// transaction as the insert.
    pub fn create(&self, new: NewSubmission) -> Result<PaymentSubmission, LedgerError> {
        if let Some(amount) = new.amount {
            if amount <= 0 {
                return Err(LedgerError::Validation(format!(
                    "amount must be positive, got {amount}"
                )));
            }
        }
        if new.evidence_reference.trim().is_empty() {
            return Err(LedgerError::Validation(
                "evidence reference must not be empty".into(),
            ));
        }

        let sub = PaymentSubmission {
            id: Uuid::new_v4(),
            sender_id: new.sender_id,
            unit_id: new.unit_id,
            fee_period: new.fee_period,
            amount: new.amount,
            transaction_reference: new.transaction_reference,
            payer_name: new.payer_name,
            contact_email: new.contact_email,
            evidence_reference: new.evidence_reference,
            raw_text: new.raw_text,
            status: new.status,
            submitted_at: chrono::Utc::now().naive_utc(),
            resolved_by: None,
            resolved_at: None,
        };

        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(DatabaseError::from)?;
        payment::insert(&tx, &sub)?;
        if sub.status == PaymentStatus::Completed {
            credit_resident(&tx, &sub, sub.submitted_at)?;
        }
        tx.commit().map_err(DatabaseError::from)?;

        tracing::info!(
            id = %sub.id,
            status = sub.status.as_str(),
            unit = sub.unit_id.as_deref().unwrap_or("-"),
            "submission recorded"
        );
        Ok(sub)
    }

    pub fn get(&self, id: Uuid) -> Result<PaymentSubmission, LedgerError> {
        let guard = self.lock()?;
        payment::get_by_id(&guard, id)?
            .ok_or_else(|| LedgerError::NotFound(format!("submission {id}")))
    }

    /// Pending submissions, oldest first.
    pub fn list_pending(&self) -> Result<Vec<PaymentSubmission>, LedgerError> {
        let guard = self.lock()?;
        Ok(payment::list_by_status(&guard, PaymentStatus::PendingReview)?)
    }

    /// Apply a review decision. Exactly one caller can win the transition
    /// out of `PendingReview`; everyone else gets `AlreadyResolved` with
    /// the status the winner set.
    pub fn resolve(
        &self,
        id: Uuid,
        decision: Decision,
        resolved_by: &str,
    ) -> Result<PaymentSubmission, LedgerError> {
        let new_status = decision.target_status();
        let resolved_at = chrono::Utc::now().naive_utc();

        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(DatabaseError::from)?;

        let current = payment::get_by_id(&tx, id)?
            .ok_or_else(|| LedgerError::NotFound(format!("submission {id}")))?;
        if current.status != PaymentStatus::PendingReview {
            return Err(LedgerError::AlreadyResolved {
                id,
                status: current.status,
            });
        }

        let affected = payment::resolve_if_pending(&tx, id, new_status, resolved_by, resolved_at)?;
        if affected == 0 {
            // Lost the race between read and update within this process.
            return Err(LedgerError::AlreadyResolved {
                id,
                status: current.status,
            });
        }

        if new_status == PaymentStatus::Verified {
            credit_resident(&tx, &current, resolved_at)?;
        }

        tx.commit().map_err(DatabaseError::from)?;

        tracing::info!(
            id = %id,
            decision = decision.as_str(),
            resolved_by,
            "submission resolved"
        );

        let mut resolved = current;
        resolved.status = new_status;
        resolved.resolved_by = Some(resolved_by.to_string());
        resolved.resolved_at = Some(resolved_at);
        Ok(resolved)
    }

    /// Submissions in the given statuses submitted strictly after `since`.
    pub fn query_since(
        &self,
        statuses: &[PaymentStatus],
        since: NaiveDateTime,
    ) -> Result<Vec<PaymentSubmission>, LedgerError> {
        let guard = self.lock()?;
        Ok(payment::list_submitted_since(&guard, statuses, since)?)
    }

    pub fn watermark(&self) -> Result<NaiveDateTime, LedgerError> {
        let guard = self.lock()?;
        Ok(watermark::get(&guard)?)
    }

    /// Move the reporting watermark forward. A timestamp at or before the
    /// current mark is a no-op, so the watermark never regresses.
    pub fn advance_watermark(&self, to: NaiveDateTime) -> Result<(), LedgerError> {
        let guard = self.lock()?;
        let current = watermark::get(&guard)?;
        if to > current {
            watermark::set(&guard, to)?;
        }
        Ok(())
    }

    pub fn resident(&self, unit_id: &str) -> Result<ResidentAccount, LedgerError> {
        let guard = self.lock()?;
        resident::get(&guard, unit_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("resident {unit_id}")))
    }
}

/// Credit the submission's amount to its unit. Requires both the unit and
/// the amount; the caller's transaction rolls back on failure.
fn credit_resident(
    conn: &Connection,
    sub: &PaymentSubmission,
    paid_at: NaiveDateTime,
) -> Result<(), LedgerError> {
    let unit_id = sub.unit_id.as_deref().ok_or_else(|| {
        LedgerError::Validation("cannot accept a payment without a unit".into())
    })?;
    let amount = sub.amount.ok_or_else(|| {
        LedgerError::Validation("cannot accept a payment without an amount".into())
    })?;
    let affected = resident::credit(conn, unit_id, amount, paid_at)?;
    if affected == 0 {
        return Err(LedgerError::Validation(format!(
            "no resident account for unit {unit_id}"
        )));
    }
    Ok(())
}
