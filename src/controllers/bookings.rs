use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{BookingStatus, BookingWithSeats};
use crate::services::payment::{apply_webhook, PaymentWebhook};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/{id}", get(get_booking).delete(delete_booking))
        .route("/bookings/{id}/cancel", patch(cancel_booking))
        .route("/bookings/{id}/payment", post(initiate_payment))
        .route("/bookings/{id}/payment/{payment_id}", get(payment_status))
}

/* ---------- helpers ---------- */

async fn owned_booking(state: &AppState, user: AuthUser, booking_id: i64) -> AppResult<BookingWithSeats> {
    let booking = state.lifecycle.get_booking(booking_id).await?;
    if booking.booking.user_id != user.user_id {
        return Err(AppError::Unauthorized(format!(
            "booking {} does not belong to user {}",
            booking_id, user.user_id
        )));
    }
    Ok(booking)
}

/* ---------- handlers ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    #[validate(range(min = 1))]
    showtime_id: i64,
    #[validate(length(min = 1, max = 50))]
    seat_ids: Vec<i64>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let booking = state
        .reservations
        .create_booking(user.user_id, req.showtime_id, &req.seat_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
async fn list_bookings(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    let bookings = state.lifecycle.list_bookings_by_user(user.user_id).await?;
    Ok(Json(bookings))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(owned_booking(&state, user, id).await?))
}

// PATCH /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let booking = state.lifecycle.cancel_booking(user.user_id, id).await?;
    Ok(Json(booking))
}

// DELETE /api/bookings/{id}
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    owned_booking(&state, user, id).await?;
    state.lifecycle.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/bookings/{id}/payment
async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let booking = owned_booking(&state, user, id).await?.booking;
    if booking.payment_status.is_terminal() {
        return Err(AppError::InvalidTransition {
            booking_id: booking.booking_id,
            current: booking.payment_status,
            requested: BookingStatus::Confirmed,
        });
    }

    let payment = state.payment.init_payment(&booking).await?;
    tracing::info!(
        "Payment {:?} opened for booking {}",
        payment.payment_id,
        booking.booking_id
    );

    Ok(Json(json!({
        "booking_id": booking.booking_id,
        "payment_id": payment.payment_id,
        "payment_url": payment.payment_url,
        "amount": booking.total_amount,
        "currency": state.config.payment.currency,
    })))
}

// GET /api/bookings/{id}/payment/{payment_id}
// Asks the gateway directly and applies the answer, for when a webhook is lost.
async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path((id, payment_id)): Path<(i64, String)>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let booking = owned_booking(&state, user, id).await?.booking;

    let check = state.payment.check_payment_status(&payment_id).await?;
    if check.order_id.as_deref() != Some(booking.booking_id.to_string().as_str()) {
        return Err(AppError::InvalidInput(format!(
            "payment {} does not belong to booking {}",
            payment_id, booking.booking_id
        )));
    }

    let gateway_status = check.status.unwrap_or_default();
    let updated = apply_webhook(
        &state.lifecycle,
        &PaymentWebhook {
            payment_id: payment_id.clone(),
            order_id: booking.booking_id.to_string(),
            status: gateway_status.clone(),
        },
    )
    .await?;

    Ok(Json(json!({
        "booking_id": booking.booking_id,
        "payment_id": payment_id,
        "payment_status": gateway_status,
        "booking_status": updated.map(|b| b.payment_status).unwrap_or(booking.payment_status),
    })))
}
