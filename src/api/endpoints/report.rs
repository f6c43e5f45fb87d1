use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::types::AppContext;
use crate::scheduler::TriggerOutcome;

#[derive(Serialize)]
pub struct TriggerResponse {
    pub outcome: &'static str,
}

/// Kick off a report run now. The response acknowledges the request; the
/// run itself happens in the background.
pub async fn run(State(ctx): State<AppContext>) -> (StatusCode, Json<TriggerResponse>) {
    let outcome = match ctx.scheduler.trigger() {
        TriggerOutcome::Started => "started",
        TriggerOutcome::Duplicate => "duplicate",
        TriggerOutcome::Busy => "busy",
    };
    (StatusCode::ACCEPTED, Json(TriggerResponse { outcome }))
}
