use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::EntityStatus;

/// One screening of one movie on one screen. The (movie, screen, date, time)
/// tuple is unique among active rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: i64,
    pub movie_id: i64,
    pub screen_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewShowtime {
    #[validate(range(min = 1))]
    pub movie_id: i64,
    #[validate(range(min = 1))]
    pub screen_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieSchedule {
    pub id: i64,
    pub movie_id: i64,
    pub theater_id: i64,
    pub showtime_id: i64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovieSchedule {
    #[validate(range(min = 1))]
    pub movie_id: i64,
    #[validate(range(min = 1))]
    pub theater_id: i64,
    #[validate(range(min = 1))]
    pub showtime_id: i64,
}
