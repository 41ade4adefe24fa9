use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub genre: String,
    pub release_date: NaiveDate,
    pub rating: f64,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovie {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub genre: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: f64,
    #[validate(length(min = 1, max = 100))]
    pub language: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TheaterType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScreenType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SeatCategory {
    pub id: i64,
    pub name: String,
}
