use std::sync::Arc;

use crate::ledger::Ledger;
use crate::pipeline::ReceiptProcessor;
use crate::review::ReviewDesk;
use crate::scheduler::ReportScheduler;

/// Shared handler state: the composition root hands one of these to the
/// router.
#[derive(Clone)]
pub struct AppContext {
    pub ledger: Arc<Ledger>,
    pub desk: Arc<ReviewDesk>,
    pub processor: Arc<ReceiptProcessor>,
    pub scheduler: Arc<ReportScheduler>,
}
