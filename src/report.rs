//! Periodic payment reporting. Each run exports everything accepted since
//! the watermark as CSV, mails it to the committee address when non-empty,
//! and advances the watermark to the end of the window.

use std::sync::Arc;

use chrono::NaiveDateTime;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::ledger::{Ledger, LedgerError};
use crate::models::{format_minor_units, PaymentStatus, PaymentSubmission};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

pub trait ReportMailer: Send + Sync {
    fn send(&self, subject: &str, csv_body: &str) -> Result<(), MailError>;
}

/// SMTP delivery via the committee mailbox.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: lettre::message::Mailbox,
    to: lettre::message::Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from: &str,
        to: &str,
    ) -> Result<Self, MailError> {
        let transport = SmtpTransport::relay(host)
            .map_err(|e| MailError::Delivery(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self {
            transport,
            from: parse_mailbox(from)?,
            to: parse_mailbox(to)?,
        })
    }
}

fn parse_mailbox(addr: &str) -> Result<lettre::message::Mailbox, MailError> {
    addr.parse()
        .map_err(|_| MailError::Delivery(format!("invalid mailbox address: {addr}")))
}

impl ReportMailer for SmtpMailer {
    fn send(&self, subject: &str, csv_body: &str) -> Result<(), MailError> {
        let csv_type = ContentType::parse("text/csv")
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(String::from(
                        "Attached: incremental payment report.",
                    )))
                    .singlepart(
                        Attachment::new("payment_report.csv".to_string())
                            .body(csv_body.to_string(), csv_type),
                    ),
            )
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        self.transport
            .send(&email)
            .map(|_| ())
            .map_err(|e| MailError::Delivery(e.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("CSV encoding failed: {0}")]
    Csv(String),
}

/// What one report run covered.
#[derive(Debug)]
pub struct ReportOutcome {
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub rows: usize,
    /// False when the window was empty or the mail bounced.
    pub delivered: bool,
}

pub struct ReportEngine {
    ledger: Arc<Ledger>,
    mailer: Arc<dyn ReportMailer>,
}

const REPORTED_STATUSES: [PaymentStatus; 2] =
    [PaymentStatus::Verified, PaymentStatus::Completed];

impl ReportEngine {
    pub fn new(ledger: Arc<Ledger>, mailer: Arc<dyn ReportMailer>) -> Self {
        Self { ledger, mailer }
    }

    /// Run one report cycle over the window (watermark, now].
    ///
    /// The watermark advances even when delivery fails; a payment is
    /// reported at most once and a lost report is recoverable from the
    /// ledger, while a resend would double-count.
    pub fn run(&self) -> Result<ReportOutcome, ReportError> {
        let window_start = self.ledger.watermark()?;
        let window_end = chrono::Utc::now().naive_utc();

        let accepted = self.ledger.query_since(&REPORTED_STATUSES, window_start)?;
        let in_window: Vec<_> = accepted
            .into_iter()
            .filter(|sub| sub.submitted_at <= window_end)
            .collect();

        let mut delivered = false;
        if in_window.is_empty() {
            tracing::info!(%window_start, %window_end, "report window empty, no mail");
        } else {
            let csv = render_csv(&in_window)?;
            let subject = format!(
                "Payment report {} - {} ({} payments)",
                window_start.format("%Y-%m-%d %H:%M"),
                window_end.format("%Y-%m-%d %H:%M"),
                in_window.len(),
            );
            match self.mailer.send(&subject, &csv) {
                Ok(()) => {
                    delivered = true;
                    tracing::info!(rows = in_window.len(), "report mailed");
                }
                Err(err) => {
                    tracing::error!(error = %err, rows = in_window.len(), "report mail failed");
                }
            }
        }

        self.ledger.advance_watermark(window_end)?;
        Ok(ReportOutcome {
            window_start,
            window_end,
            rows: in_window.len(),
            delivered,
        })
    }
}

const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "unit_id",
    "fee_period",
    "amount",
    "transaction_reference",
    "payer_name",
    "email",
    "status",
];

fn render_csv(rows: &[PaymentSubmission]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ReportError::Csv(e.to_string()))?;
    for sub in rows {
        writer
            .write_record([
                sub.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                sub.unit_id.clone().unwrap_or_default(),
                sub.fee_period.clone().unwrap_or_default(),
                sub.amount.map(format_minor_units).unwrap_or_default(),
                sub.transaction_reference.clone().unwrap_or_default(),
                sub.payer_name.clone().unwrap_or_default(),
                sub.contact_email.clone().unwrap_or_default(),
                sub.status.as_str().to_string(),
            ])
            .map_err(|e| ReportError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Csv(e.to_string()))
}

/// Stand-in when SMTP is not configured. Every send fails softly, so runs
/// still advance the watermark and log what would have gone out.
pub struct DisabledMailer;

impl ReportMailer for DisabledMailer {
    fn send(&self, subject: &str, _csv_body: &str) -> Result<(), MailError> {
        Err(MailError::Delivery(format!(
            "SMTP not configured, dropping \"{subject}\""
        )))
    }
}

/// Recording mailer for tests; can be told to bounce.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryMailer {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub bounce: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl ReportMailer for MemoryMailer {
    fn send(&self, subject: &str, csv_body: &str) -> Result<(), MailError> {
        if self.bounce.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Delivery("mailbox unavailable".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), csv_body.to_string()));
        Ok(())
    }
}
