use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::EntityStatus;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Theater {
    pub id: i64,
    pub name: String,
    pub place: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub owner_id: i64,
    pub number_of_screens: i32,
    pub theater_type_id: i64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTheater {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub place: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub district: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(range(min = 1))]
    pub number_of_screens: i32,
    #[validate(range(min = 1))]
    pub theater_type_id: i64,
}

/// Partial update: absent, empty or zero fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TheaterUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub number_of_screens: Option<i32>,
    #[serde(default)]
    pub theater_type_id: Option<i64>,
}

impl TheaterUpdate {
    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn place(&self) -> Option<&str> {
        non_blank(&self.place)
    }

    pub fn city(&self) -> Option<&str> {
        non_blank(&self.city)
    }

    pub fn district(&self) -> Option<&str> {
        non_blank(&self.district)
    }

    pub fn state(&self) -> Option<&str> {
        non_blank(&self.state)
    }

    pub fn number_of_screens(&self) -> Option<i32> {
        self.number_of_screens.filter(|n| *n != 0)
    }

    pub fn theater_type_id(&self) -> Option<i64> {
        self.theater_type_id.filter(|id| *id != 0)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TheaterScreen {
    pub id: i64,
    pub theater_id: i64,
    pub screen_number: i32,
    pub seat_capacity: i32,
    pub screen_type_id: i64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTheaterScreen {
    #[validate(range(min = 1))]
    pub screen_number: i32,
    #[validate(range(min = 1))]
    pub seat_capacity: i32,
    #[validate(range(min = 1))]
    pub screen_type_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TheaterScreenUpdate {
    #[serde(default)]
    pub screen_number: Option<i32>,
    #[serde(default)]
    pub seat_capacity: Option<i32>,
    #[serde(default)]
    pub screen_type_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_zero_update_fields_are_ignored() {
        let update = TheaterUpdate {
            name: Some("   ".into()),
            city: Some("Kochi".into()),
            number_of_screens: Some(0),
            theater_type_id: Some(3),
            ..Default::default()
        };
        assert_eq!(update.name(), None);
        assert_eq!(update.city(), Some("Kochi"));
        assert_eq!(update.number_of_screens(), None);
        assert_eq!(update.theater_type_id(), Some(3));
        assert_eq!(update.state(), None);
    }
}
