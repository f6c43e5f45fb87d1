use std::sync::Arc;

use thiserror::Error;

use crate::ledger::{Ledger, LedgerError};
use crate::messages;
use crate::models::{NewSubmission, PaymentStatus, PaymentSubmission};
use crate::notify::Notifier;
use crate::storage::{EvidenceStore, StorageError};

use super::classify::Classifier;
use super::fields::FieldExtractor;
use super::ocr::{OcrGateway, OcrOutcome};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What the pipeline produced for one inbound receipt.
#[derive(Debug)]
pub struct SubmissionReceipt {
    pub submission: PaymentSubmission,
    pub missing: Vec<&'static str>,
    pub ocr_failed: bool,
}

/// Drives one submission end to end: OCR, extraction, classification,
/// evidence persistence, ledger write, and the acknowledgement push.
pub struct ReceiptProcessor {
    ocr: OcrGateway,
    extractor: FieldExtractor,
    classifier: Classifier,
    ledger: Arc<Ledger>,
    evidence: Arc<dyn EvidenceStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReceiptProcessor {
    pub fn new(
        ocr: OcrGateway,
        classifier: Classifier,
        ledger: Arc<Ledger>,
        evidence: Arc<dyn EvidenceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            ocr,
            extractor: FieldExtractor::new()?,
            classifier,
            ledger,
            evidence,
            notifier,
        })
    }

    pub fn process(
        &self,
        sender_id: &str,
        caption: &str,
        image: &[u8],
    ) -> Result<SubmissionReceipt, PipelineError> {
        let (raw_text, ocr_failed) = match self.ocr.recognize(image) {
            OcrOutcome::Text(text) => (text, false),
            OcrOutcome::Failed => (String::new(), true),
        };

        let candidates = self.extractor.extract(caption, &raw_text);
        let (fields, status) = self.classifier.classify(candidates);

        let evidence_reference = self.evidence.save(fields.unit_id.as_deref(), image)?;

        let submission = self.ledger.create(NewSubmission {
            sender_id: sender_id.to_string(),
            unit_id: fields.unit_id,
            fee_period: fields.fee_period,
            amount: fields.amount,
            transaction_reference: fields.transaction_reference,
            payer_name: fields.payer_name,
            contact_email: fields.contact_email,
            evidence_reference,
            raw_text,
            status,
        })?;

        let missing = submission.missing_fields();
        self.acknowledge(sender_id, &submission, &missing)?;

        tracing::info!(
            id = %submission.id,
            status = submission.status.as_str(),
            ocr_failed,
            missing = missing.len(),
            "receipt processed"
        );
        Ok(SubmissionReceipt {
            submission,
            missing,
            ocr_failed,
        })
    }

    fn acknowledge(
        &self,
        sender_id: &str,
        submission: &PaymentSubmission,
        missing: &[&'static str],
    ) -> Result<(), PipelineError> {
        if submission.status == PaymentStatus::Completed {
            if let Some(unit_id) = submission.unit_id.as_deref() {
                let account = self.ledger.resident(unit_id)?;
                self.notifier
                    .notify_resident(sender_id, &messages::auto_completed(submission, account.balance));
            }
        } else {
            self.notifier
                .notify_resident(sender_id, &messages::pending_ack(missing));
            self.notifier
                .notify_staff(&messages::staff_new_pending(submission));
        }
        Ok(())
    }
}
