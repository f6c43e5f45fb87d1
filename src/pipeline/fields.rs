//! Pure regex extraction of payment fields from the caption and OCR text.
//!
//! Extraction is deliberately dumb: first match wins per field, no
//! cross-field consistency checks. Validation happens downstream in the
//! classifier.

use regex::Regex;

/// Field candidates pulled out of a submission. Everything optional; the
/// classifier decides what the gaps mean.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFields {
    pub unit_id: Option<String>,
    pub fee_period: Option<String>,
    /// Minor units (satang).
    pub amount: Option<i64>,
    pub transaction_reference: Option<String>,
    pub payer_name: Option<String>,
    pub contact_email: Option<String>,
}

pub struct FieldExtractor {
    unit: Regex,
    fee_period: Regex,
    email: Regex,
    amount_currency: Regex,
    amount_labelled: Regex,
    reference: Regex,
    payer: Regex,
}

impl FieldExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            unit: Regex::new(r"(88/\d{1,3})")?,
            fee_period: Regex::new(r"(\d{4}[-/.]\d{1,2})")?,
            email: Regex::new(r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})")?,
            // Number followed by a currency word, e.g. "1,500.00 Baht".
            amount_currency: Regex::new(r"(?i)([\d,]+(?:\.\d{1,2})?)\s*(?:baht|บาท|฿)")?,
            // Labelled number, e.g. "Amount: 1500".
            amount_labelled: Regex::new(
                r"(?i)(?:total|amount|ยอดรวม|ยอด|รวม|จำนวนเงิน)\s*:?\s*([\d,]+(?:\.\d{1,2})?)",
            )?,
            reference: Regex::new(
                r"(?i)(?:txn\s*id|transaction\s*id|ref\.?\s*no\.?|reference|เลขที่อ้างอิง|เลขที่รายการ)\s*:?\s*([A-Za-z0-9-]+)",
            )?,
            payer: Regex::new(
                r"(?i)(?:sender|from|ผู้โอน|ชื่อ)\s*:\s*([ก-๙A-Za-z][ก-๙A-Za-z ]*)",
            )?,
        })
    }

    /// Extract candidates from a submission. The caption is the primary
    /// source for what the resident typed (unit, period, email); the OCR
    /// text is primary for what the bank printed (amount, reference,
    /// payer). Each field falls back to the other source.
    pub fn extract(&self, caption: &str, ocr_text: &str) -> CandidateFields {
        CandidateFields {
            unit_id: first_capture(&self.unit, &[caption, ocr_text]),
            fee_period: first_capture(&self.fee_period, &[caption, ocr_text]),
            contact_email: first_capture(&self.email, &[caption, ocr_text]),
            amount: self.extract_amount(&[ocr_text, caption]),
            transaction_reference: first_capture(&self.reference, &[ocr_text, caption]),
            payer_name: first_capture(&self.payer, &[ocr_text, caption])
                .map(|name| name.trim().to_string()),
        }
    }

    fn extract_amount(&self, texts: &[&str]) -> Option<i64> {
        for text in texts {
            for re in [&self.amount_currency, &self.amount_labelled] {
                if let Some(raw) = re.captures(text).and_then(|c| c.get(1)) {
                    if let Some(minor) = parse_minor_units(raw.as_str()) {
                        return Some(minor);
                    }
                }
            }
        }
        None
    }
}

fn first_capture(re: &Regex, texts: &[&str]) -> Option<String> {
    texts.iter().find_map(|text| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Parse a human-formatted amount ("1,500.00") into positive minor units.
fn parse_minor_units(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * 100.0).round() as i64)
}
