//! Receipt processing pipeline: OCR, field extraction, classification,
//! and the processor that drives a submission end to end.

pub mod classify;
pub mod fields;
pub mod ocr;
pub mod processor;

pub use classify::Classifier;
pub use fields::{CandidateFields, FieldExtractor};
pub use ocr::{OcrEngine, OcrOutcome};
pub use processor::{ReceiptProcessor, SubmissionReceipt};
