//! Error taxonomy shared by every service.
//!
//! Services return [`AppResult`]; handlers hand the error straight to axum,
//! which renders it through the [`IntoResponse`] impl below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;

use crate::models::BookingStatus;
use crate::services::payment::PaymentError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A referenced entity does not exist (or is tombstoned).
    #[error("{0}")]
    NotFound(String),

    /// The request is malformed or resolves to nothing usable.
    #[error("{0}")]
    InvalidInput(String),

    /// A live entity with the same identity already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// An owner locality ceiling or a per-theater ceiling was reached.
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("seats {seat_ids:?} are already booked for showtime {showtime_id}")]
    SeatsAlreadyBooked { showtime_id: i64, seat_ids: Vec<i64> },

    /// The caller does not own the resource.
    #[error("{0}")]
    Unauthorized(String),

    #[error("booking {booking_id} is {current} and cannot move to {requested}")]
    InvalidTransition {
        booking_id: i64,
        current: BookingStatus,
        requested: BookingStatus,
    },

    #[error("booking transaction did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            AppError::SeatsAlreadyBooked { .. } => "SEATS_ALREADY_BOOKED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            AppError::Database(_) | AppError::Payment(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::QuotaExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SeatsAlreadyBooked { .. } => status_419(),
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// Seat conflicts get their own status so clients can prompt re-selection
fn status_419() -> StatusCode {
    StatusCode::from_u16(419).unwrap_or(StatusCode::CONFLICT)
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage details stay in the logs
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_conflicts_use_dedicated_status() {
        let err = AppError::SeatsAlreadyBooked { showtime_id: 42, seat_ids: vec![2] };
        assert_eq!(err.status_code().as_u16(), 419);
        assert_eq!(err.code(), "SEATS_ALREADY_BOOKED");
        assert_eq!(err.to_string(), "seats [2] are already booked for showtime 42");
    }

    #[test]
    fn storage_failures_are_internal() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code(), "INTERNAL");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn transition_message_names_both_states() {
        let err = AppError::InvalidTransition {
            booking_id: 9,
            current: BookingStatus::Confirmed,
            requested: BookingStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "booking 9 is Confirmed and cannot move to Cancelled");
    }
}
