//! Village maintenance-fee payment service.
//!
//! Residents submit photographed bank-transfer receipts with a short
//! caption; the pipeline OCRs the image, extracts the payment fields,
//! auto-completes fully-identified payments, and queues the rest for
//! staff review. Accepted payments credit the unit's balance and are
//! mailed to the committee as periodic CSV reports.

pub mod api;
pub mod authorization;
pub mod config;
pub mod db;
pub mod ledger;
pub mod messages;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod review;
pub mod scheduler;
pub mod storage;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{build_router, AppContext};
use crate::authorization::StaffRoster;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::notify::{LineNotifier, Notifier};
use crate::pipeline::classify::ValidUnits;
use crate::pipeline::ocr::{GeminiOcr, OcrGateway};
use crate::pipeline::{Classifier, ReceiptProcessor};
use crate::report::{DisabledMailer, ReportEngine, ReportMailer, SmtpMailer};
use crate::review::ReviewDesk;
use crate::scheduler::ReportScheduler;
use crate::storage::{EvidenceStore, FsEvidenceStore};

/// Composition root. Wires every component from configuration, spawns the
/// report scheduler, and serves the API until the process is stopped.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let ledger = Arc::new(Ledger::open(&config.data_dir.join("extenso.db"))?);
    let evidence = Arc::new(FsEvidenceStore::new(config.data_dir.join("receipts"))?)
        as Arc<dyn EvidenceStore>;
    let notifier = Arc::new(LineNotifier::new(
        config.line_push_url.clone(),
        config.line_channel_token.clone(),
        config.staff_group_id.clone(),
    )?) as Arc<dyn Notifier>;

    let ocr = GeminiOcr::new(
        config.ocr_endpoint.clone(),
        config.ocr_api_key.clone(),
        config.ocr_timeout,
    )?;
    let processor = Arc::new(ReceiptProcessor::new(
        OcrGateway::new(Box::new(ocr)),
        Classifier::new(ValidUnits::standard()),
        Arc::clone(&ledger),
        Arc::clone(&evidence),
        Arc::clone(&notifier),
    )?);

    let desk = Arc::new(ReviewDesk::new(
        Arc::clone(&ledger),
        Arc::new(StaffRoster::new(config.reviewer_ids.clone())),
        Arc::clone(&notifier),
        Arc::clone(&evidence),
    ));

    let mailer: Arc<dyn ReportMailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            smtp.port,
            smtp.username.clone(),
            smtp.password.clone(),
            &smtp.from,
            &smtp.to,
        )?),
        None => {
            tracing::warn!("SMTP not configured, reports will not be mailed");
            Arc::new(DisabledMailer)
        }
    };
    let engine = Arc::new(ReportEngine::new(Arc::clone(&ledger), mailer));
    let scheduler = Arc::new(ReportScheduler::new(engine, config.report_times.clone()));
    tokio::spawn(Arc::clone(&scheduler).run_forever());

    let app = build_router(AppContext {
        ledger,
        desk,
        processor,
        scheduler: Arc::clone(&scheduler),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "serving");
    axum::serve(listener, app).await?;

    scheduler.shutdown();
    Ok(())
}
