//! Staff review workflow: queue listing, decisions, and evidence access.
//! Every entry point authenticates the actor before touching the ledger.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::authorization::Authorizer;
use crate::ledger::{Ledger, LedgerError};
use crate::messages;
use crate::models::{Decision, PaymentStatus, PaymentSubmission};
use crate::notify::Notifier;
use crate::storage::{EvidenceStore, StorageError};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Actor {actor_id} is not allowed to review submissions")]
    PermissionDenied { actor_id: String },

    #[error("Evidence missing for submission {id}")]
    EvidenceMissing { id: Uuid },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a decision request. A lost race is an outcome, not an error;
/// the caller decides how loudly to report it.
#[derive(Debug)]
pub enum DecisionOutcome {
    Applied(PaymentSubmission),
    AlreadyResolved(PaymentStatus),
}

pub struct ReviewDesk {
    ledger: Arc<Ledger>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    evidence: Arc<dyn EvidenceStore>,
}

impl ReviewDesk {
    pub fn new(
        ledger: Arc<Ledger>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn Notifier>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> Self {
        Self {
            ledger,
            authorizer,
            notifier,
            evidence,
        }
    }

    fn authorize(&self, actor_id: &str) -> Result<(), ReviewError> {
        if self.authorizer.can_review(actor_id) {
            Ok(())
        } else {
            tracing::warn!(actor_id, "review access denied");
            Err(ReviewError::PermissionDenied {
                actor_id: actor_id.to_string(),
            })
        }
    }

    /// The pending queue, oldest first.
    pub fn list_for_review(&self, actor_id: &str) -> Result<Vec<PaymentSubmission>, ReviewError> {
        self.authorize(actor_id)?;
        Ok(self.ledger.list_pending()?)
    }

    /// Apply an approve/reject decision and push the outcome to the
    /// resident and the staff group.
    pub fn apply_decision(
        &self,
        actor_id: &str,
        id: Uuid,
        decision: Decision,
    ) -> Result<DecisionOutcome, ReviewError> {
        self.authorize(actor_id)?;

        let resolved = match self.ledger.resolve(id, decision, actor_id) {
            Ok(sub) => sub,
            Err(LedgerError::AlreadyResolved { status, .. }) => {
                return Ok(DecisionOutcome::AlreadyResolved(status));
            }
            Err(err) => return Err(err.into()),
        };

        match resolved.status {
            PaymentStatus::Verified => {
                if let Some(unit_id) = resolved.unit_id.as_deref() {
                    let balance = self.ledger.resident(unit_id)?.balance;
                    self.notifier
                        .notify_resident(&resolved.sender_id, &messages::approved(&resolved, balance));
                }
            }
            PaymentStatus::Rejected => {
                self.notifier
                    .notify_resident(&resolved.sender_id, &messages::rejected(&resolved));
            }
            _ => {}
        }
        self.notifier
            .notify_staff(&messages::staff_decision_echo(&resolved, actor_id));

        Ok(DecisionOutcome::Applied(resolved))
    }

    /// Load the receipt image for a submission under review.
    pub fn fetch_evidence(&self, actor_id: &str, id: Uuid) -> Result<Vec<u8>, ReviewError> {
        self.authorize(actor_id)?;
        let submission = self.ledger.get(id)?;
        match self.evidence.load(&submission.evidence_reference) {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => Err(ReviewError::EvidenceMissing { id }),
            Err(err) => Err(err.into()),
        }
    }
}
