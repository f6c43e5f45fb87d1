use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PaymentStatus;

/// A single payment-receipt submission and its review lifecycle.
///
/// Created once per inbound receipt, transitions at most once from
/// `PendingReview` to a terminal status (or is born `Completed` when every
/// required field was extracted), and is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub id: Uuid,
    /// Messaging-channel id of the submitting resident.
    pub sender_id: String,
    /// Unit token, present only when it matched the valid-unit range.
    pub unit_id: Option<String>,
    /// Year-month token the payment is for (e.g. "2025-11").
    pub fee_period: Option<String>,
    /// Amount in minor units (satang). Required for auto-completion.
    pub amount: Option<i64>,
    /// Bank transfer reference extracted from the receipt.
    pub transaction_reference: Option<String>,
    pub payer_name: Option<String>,
    pub contact_email: Option<String>,
    /// Opaque pointer into the evidence store (receipt image).
    pub evidence_reference: String,
    /// Raw OCR output, retained for audit.
    pub raw_text: String,
    pub status: PaymentStatus,
    pub submitted_at: NaiveDateTime,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<NaiveDateTime>,
}

impl PaymentSubmission {
    /// Names of the required fields that are still missing.
    ///
    /// Mirrors the auto-completion rule: a submission completes only when the
    /// unit, fee period, amount, and transaction reference are all present.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.unit_id.is_none() {
            missing.push("unit_id");
        }
        if self.fee_period.is_none() {
            missing.push("fee_period");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.transaction_reference.is_none() {
            missing.push("transaction_reference");
        }
        missing
    }
}

/// Input for `Ledger::create`: everything except the store-assigned parts.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub sender_id: String,
    pub unit_id: Option<String>,
    pub fee_period: Option<String>,
    pub amount: Option<i64>,
    pub transaction_reference: Option<String>,
    pub payer_name: Option<String>,
    pub contact_email: Option<String>,
    pub evidence_reference: String,
    pub raw_text: String,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> PaymentSubmission {
        PaymentSubmission {
            id: Uuid::new_v4(),
            sender_id: "U123".into(),
            unit_id: Some("88/07".into()),
            fee_period: Some("2025-11".into()),
            amount: Some(150_000),
            transaction_reference: Some("ABC123".into()),
            payer_name: Some("Somsak Wong".into()),
            contact_email: None,
            evidence_reference: "88-07_20251101_abc.jpg".into(),
            raw_text: "Total 1,500.00 Baht".into(),
            status: PaymentStatus::Completed,
            submitted_at: chrono::Utc::now().naive_utc(),
            resolved_by: None,
            resolved_at: None,
        }
    }

    #[test]
    fn complete_submission_has_no_missing_fields() {
        assert!(submission().missing_fields().is_empty());
    }

    #[test]
    fn missing_fields_are_enumerated() {
        let mut sub = submission();
        sub.unit_id = None;
        sub.amount = None;
        assert_eq!(sub.missing_fields(), vec!["unit_id", "amount"]);
    }
}
