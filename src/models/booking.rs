use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Payment status of a booking.
///
/// `Pending` is the only non-terminal state: it moves to `Confirmed` on a
/// successful payment and to `Cancelled` on failure, timeout or an explicit
/// cancel. Only non-cancelled bookings hold their seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub user_id: i64,
    pub showtime_id: i64,
    pub screen_id: i64,
    pub booking_date: DateTime<Utc>,
    pub total_amount: f64,
    pub payment_status: BookingStatus,
}

/// Occupancy record: `seat_id` is held for `showtime_id` while `released` is false.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingSeat {
    pub booking_id: i64,
    pub seat_id: i64,
    pub showtime_id: i64,
    pub released: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithSeats {
    #[serde(flatten)]
    pub booking: Booking,
    pub seats: Vec<BookingSeat>,
}

impl BookingWithSeats {
    pub fn seat_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.seats.iter().map(|s| s.seat_id).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_bookings_transition() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(Confirmed.is_terminal() && Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
    }
}
