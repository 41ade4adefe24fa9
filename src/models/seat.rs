use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::EntityStatus;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub screen_id: i64,
    pub seat_number: String,
    pub row_label: String,
    pub column_number: i32,
    pub seat_category_id: i64,
    pub category_price: f64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A run of rows sharing one category and price, e.g. rows `A..=C` at 150.0.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SeatBand {
    #[validate(length(equal = 1))]
    pub row_start: String,
    #[validate(length(equal = 1))]
    pub row_end: String,
    #[validate(range(min = 1))]
    pub seat_category_id: i64,
    #[validate(range(min = 0.0))]
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSeatsRequest {
    #[validate(range(min = 1, max = 100))]
    pub total_columns: i32,
    #[validate(length(min = 1), nested)]
    pub bands: Vec<SeatBand>,
}
