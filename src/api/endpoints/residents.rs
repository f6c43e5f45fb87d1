use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::AppContext;

#[derive(Serialize)]
pub struct BalanceResponse {
    pub unit_id: String,
    pub balance: i64,
    pub balance_display: String,
    pub last_payment_at: Option<NaiveDateTime>,
}

/// Balance lookup. Unit tokens contain a slash, which cannot ride in a
/// path segment, so the route takes the dashed form ("88-07").
pub async fn balance(
    State(ctx): State<AppContext>,
    Path(unit_token): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let unit_id = unit_token.replace('-', "/");
    let ledger = Arc::clone(&ctx.ledger);
    let account = tokio::task::spawn_blocking(move || ledger.resident(&unit_id))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    Ok(Json(BalanceResponse {
        balance_display: account.balance_display(),
        unit_id: account.unit_id,
        balance: account.balance,
        last_payment_at: account.last_payment_at,
    }))
}
