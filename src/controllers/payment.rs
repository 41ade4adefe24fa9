use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppResult;
use crate::services::payment::{apply_webhook, PaymentWebhook};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments/webhook", post(payment_webhook))
}

// POST /api/payments/webhook
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentWebhook>,
) -> AppResult<impl IntoResponse> {
    tracing::info!(
        "Webhook: payment_id={}, order_id={}, status={}",
        payload.payment_id,
        payload.order_id,
        payload.status
    );

    let updated = apply_webhook(&state.lifecycle, &payload).await?;
    Ok(Json(json!({
        "received": true,
        "booking_status": updated.map(|b| b.payment_status),
    })))
}
