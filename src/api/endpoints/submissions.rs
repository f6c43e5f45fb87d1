use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::models::PaymentStatus;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub sender_id: String,
    #[serde(default)]
    pub caption: String,
    /// Receipt image, either a bare base64 string or a data URL.
    pub image: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub missing_fields: Vec<&'static str>,
    pub ocr_failed: bool,
}

pub async fn submit(
    State(ctx): State<AppContext>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    if req.sender_id.trim().is_empty() {
        return Err(ApiError::validation("sender_id must not be empty"));
    }
    let image = decode_image(&req.image)?;
    if image.is_empty() {
        return Err(ApiError::validation("image must not be empty"));
    }

    let processor = Arc::clone(&ctx.processor);
    let receipt = tokio::task::spawn_blocking(move || {
        processor.process(&req.sender_id, &req.caption, &image)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: receipt.submission.id,
            status: receipt.submission.status,
            missing_fields: receipt.missing,
            ocr_failed: receipt.ocr_failed,
        }),
    ))
}

fn decode_image(raw: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match raw.split_once("base64,") {
        Some((_, rest)) => rest,
        None => raw,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|_| ApiError::validation("image must be base64 encoded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bare_base64() {
        assert_eq!(decode_image("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn decodes_data_url() {
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_image("not base64 at all!!!").is_err());
    }
}
