//! Text builders for resident and staff notifications. Pure functions so
//! the wording stays testable away from any delivery channel.

use crate::models::{format_minor_units, PaymentSubmission};

/// Confirmation for an auto-completed payment.
pub fn auto_completed(sub: &PaymentSubmission, new_balance: i64) -> String {
    format!(
        "ได้รับการชำระเงินเรียบร้อยแล้ว / Payment received.\n\
         บ้านเลขที่ (unit): {}\n\
         งวด (period): {}\n\
         จำนวนเงิน (amount): {} บาท\n\
         ยอดคงเหลือ (balance): {} บาท",
        sub.unit_id.as_deref().unwrap_or("-"),
        sub.fee_period.as_deref().unwrap_or("-"),
        sub.amount.map(format_minor_units).unwrap_or_default(),
        format_minor_units(new_balance),
    )
}

/// Acknowledgement when fields are missing and the submission waits for
/// staff review.
pub fn pending_ack(missing: &[&str]) -> String {
    format!(
        "ได้รับสลิปแล้ว รอเจ้าหน้าที่ตรวจสอบ / Receipt received, awaiting staff review.\n\
         ข้อมูลที่ยังขาด (missing): {}",
        missing.join(", "),
    )
}

/// Staff alert for a new submission entering the review queue.
pub fn staff_new_pending(sub: &PaymentSubmission) -> String {
    format!(
        "มีสลิปใหม่รอตรวจสอบ / New receipt pending review.\n\
         id: {}\n\
         unit: {}\n\
         amount: {} บาท",
        sub.id,
        sub.unit_id.as_deref().unwrap_or("?"),
        sub.amount.map(format_minor_units).unwrap_or_else(|| "?".into()),
    )
}

/// Resident notice after an approval, with the balance after credit.
pub fn approved(sub: &PaymentSubmission, new_balance: i64) -> String {
    format!(
        "การชำระเงินได้รับการยืนยันแล้ว / Payment verified.\n\
         unit: {}\n\
         ยอดคงเหลือ (balance): {} บาท",
        sub.unit_id.as_deref().unwrap_or("-"),
        format_minor_units(new_balance),
    )
}

/// Resident notice after a rejection, asking for a clearer resubmission.
pub fn rejected(sub: &PaymentSubmission) -> String {
    format!(
        "สลิปไม่ผ่านการตรวจสอบ / Receipt could not be verified.\n\
         กรุณาส่งรูปสลิปที่ชัดเจนอีกครั้ง / Please resubmit a clearer photo.\n\
         id: {}",
        sub.id,
    )
}

/// Audit echo to the staff group after a decision is applied.
pub fn staff_decision_echo(sub: &PaymentSubmission, actor_id: &str) -> String {
    format!(
        "ตัดสินแล้ว / Decision recorded.\n\
         id: {}\n\
         status: {}\n\
         by: {actor_id}",
        sub.id,
        sub.status.as_str(),
    )
}
