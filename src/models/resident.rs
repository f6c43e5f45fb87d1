use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ledger row for one unit. Rows are seeded by the initial migration for
/// every valid unit; the balance is mutated only by the ledger's resolve
/// path (or an auto-completed creation), never by any other component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentAccount {
    pub unit_id: String,
    /// Signed minor units. Negative means the unit owes money.
    pub balance: i64,
    pub last_payment_at: Option<NaiveDateTime>,
}

impl ResidentAccount {
    /// Balance formatted in major units for human-facing messages
    /// (e.g. 150000 → "1500.00").
    pub fn balance_display(&self) -> String {
        format_minor_units(self.balance)
    }
}

/// Render minor units as a fixed-point major-unit string.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
