use std::collections::HashSet;

use crate::models::PaymentStatus;

use super::fields::CandidateFields;

/// The set of unit tokens with a seeded resident account.
///
/// Units are "88/NN" with NN zero-padded to two digits, 01 through 165.
/// An unpadded "88/7" is not a valid token.
pub struct ValidUnits {
    units: HashSet<String>,
}

impl ValidUnits {
    pub fn standard() -> Self {
        let units = (1..=165).map(|n| format!("88/{n:02}")).collect();
        Self { units }
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.units.contains(unit)
    }
}

impl Default for ValidUnits {
    fn default() -> Self {
        Self::standard()
    }
}

pub struct Classifier {
    valid_units: ValidUnits,
}

impl Classifier {
    pub fn new(valid_units: ValidUnits) -> Self {
        Self { valid_units }
    }

    /// Drop an out-of-range unit candidate, then decide the initial status:
    /// `Completed` only when unit, fee period, amount, and transaction
    /// reference are all present.
    pub fn classify(&self, mut fields: CandidateFields) -> (CandidateFields, PaymentStatus) {
        if let Some(unit) = &fields.unit_id {
            if !self.valid_units.contains(unit) {
                tracing::debug!(unit, "extracted unit is not a valid account, dropping");
                fields.unit_id = None;
            }
        }

        let complete = fields.unit_id.is_some()
            && fields.fee_period.is_some()
            && fields.amount.is_some()
            && fields.transaction_reference.is_some();

        let status = if complete {
            PaymentStatus::Completed
        } else {
            PaymentStatus::PendingReview
        };
        (fields, status)
    }
}
