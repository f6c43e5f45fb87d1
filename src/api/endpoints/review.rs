use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::actor_id;
use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::models::{Decision, PaymentStatus, PaymentSubmission};
use crate::review::DecisionOutcome;

pub async fn pending(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<PaymentSubmission>>, ApiError> {
    let actor = actor_id(&headers)?;
    let desk = Arc::clone(&ctx.desk);
    let queue = tokio::task::spawn_blocking(move || desk.list_for_review(&actor))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(queue))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub id: Uuid,
    pub status: PaymentStatus,
}

pub async fn decide(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let actor = actor_id(&headers)?;
    let desk = Arc::clone(&ctx.desk);
    let outcome = tokio::task::spawn_blocking(move || desk.apply_decision(&actor, id, req.decision))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    match outcome {
        DecisionOutcome::Applied(sub) => Ok(Json(DecisionResponse {
            id: sub.id,
            status: sub.status,
        })),
        DecisionOutcome::AlreadyResolved(status) => Err(ApiError::new(
            StatusCode::CONFLICT,
            "ALREADY_RESOLVED",
            format!("submission {id} already resolved as {status}"),
        )),
    }
}

pub async fn evidence(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_id(&headers)?;
    let desk = Arc::clone(&ctx.desk);
    let bytes = tokio::task::spawn_blocking(move || desk.fetch_evidence(&actor, id))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
