//! Seat reservation.
//!
//! A booking is created in a single transaction that re-checks occupancy for
//! the requested (showtime, seat) pairs and then inserts the booking and its
//! seat rows. Exclusion does not depend on the re-check alone: every live
//! `booking_seats` row is covered by the partial unique index
//! `booking_seats_occupancy_idx (showtime_id, seat_id) WHERE NOT released`, so
//! of two racing transactions that both pass the re-check, the second insert
//! blocks on the first and fails with a unique violation once it commits.
//! That violation is reported as [`AppError::SeatsAlreadyBooked`].
//!
//! The attempt is bounded by a deadline. The transaction sets a matching
//! `statement_timeout` and the whole future is wrapped in
//! [`tokio::time::timeout`]; on expiry the transaction is dropped and rolled
//! back, so no partial booking is ever visible.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::database::{is_unique_violation, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingSeat, BookingWithSeats, Seat, Showtime};

const OCCUPANCY_IDX: &str = "booking_seats_occupancy_idx";

// SQLSTATE query_canceled, raised when statement_timeout fires
const QUERY_CANCELED: &str = "57014";

fn is_statement_timeout(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(QUERY_CANCELED),
        _ => false,
    }
}

/// Collapses duplicates and orders ids so that concurrent requests touch
/// index entries in the same order.
pub fn normalize_seat_ids(seat_ids: &[i64]) -> Vec<i64> {
    seat_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Sum of the seats' category prices, rounded to cents.
pub fn total_amount(seats: &[Seat]) -> f64 {
    let cents: i64 = seats.iter().map(|s| (s.category_price * 100.0).round() as i64).sum();
    cents as f64 / 100.0
}

#[derive(Clone)]
pub struct ReservationEngine {
    db: Database,
    deadline: Duration,
}

impl ReservationEngine {
    pub fn new(db: Database, deadline: Duration) -> Self {
        Self { db, deadline }
    }

    /// Books `seat_ids` for `user_id` at `showtime_id`. Either the booking
    /// and every one of its seats are persisted, or nothing is.
    pub async fn create_booking(&self, user_id: i64, showtime_id: i64, seat_ids: &[i64]) -> AppResult<BookingWithSeats> {
        match tokio::time::timeout(self.deadline, self.reserve(user_id, showtime_id, seat_ids)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Booking for user {} on showtime {} exceeded its {:?} deadline",
                    user_id, showtime_id, self.deadline
                );
                Err(AppError::DeadlineExceeded(self.deadline))
            }
        }
    }

    async fn reserve(&self, user_id: i64, showtime_id: i64, seat_ids: &[i64]) -> AppResult<BookingWithSeats> {
        let seat_ids = normalize_seat_ids(seat_ids);
        if seat_ids.is_empty() {
            return Err(AppError::InvalidInput("at least one seat must be requested".to_string()));
        }

        let showtime = self.showtime(showtime_id).await?;
        let seats = self.resolve_seats(&showtime, &seat_ids).await?;
        // Priced outside the transaction; later price edits do not affect this booking
        let amount = total_amount(&seats);

        match self.write_booking(user_id, &showtime, &seat_ids, amount).await {
            Err(e) if is_statement_timeout_error(&e) => Err(AppError::DeadlineExceeded(self.deadline)),
            other => other,
        }
    }

    // Bookable only while the showtime, its screen and the screen's theater are all active
    async fn showtime(&self, id: i64) -> AppResult<Showtime> {
        sqlx::query_as::<_, Showtime>(
            r#"
            SELECT st.*
            FROM showtimes st
            JOIN theater_screens sc ON sc.id = st.screen_id
            JOIN theaters t ON t.id = sc.theater_id
            WHERE st.id = $1 AND st.status = 'active' AND sc.status = 'active' AND t.status = 'active'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("showtime {} not found", id)))
    }

    async fn resolve_seats(&self, showtime: &Showtime, seat_ids: &[i64]) -> AppResult<Vec<Seat>> {
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT * FROM seats WHERE id = ANY($1) AND screen_id = $2 AND status = 'active' ORDER BY id",
        )
        .bind(seat_ids)
        .bind(showtime.screen_id)
        .fetch_all(&self.db.pool)
        .await?;

        if seats.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "none of the requested seats exist on screen {}",
                showtime.screen_id
            )));
        }
        if seats.len() != seat_ids.len() {
            let found: HashSet<i64> = seats.iter().map(|s| s.id).collect();
            let unknown: Vec<i64> = seat_ids.iter().copied().filter(|id| !found.contains(id)).collect();
            return Err(AppError::InvalidInput(format!(
                "seats {:?} do not exist on screen {}",
                unknown, showtime.screen_id
            )));
        }
        Ok(seats)
    }

    async fn write_booking(
        &self,
        user_id: i64,
        showtime: &Showtime,
        seat_ids: &[i64],
        amount: f64,
    ) -> AppResult<BookingWithSeats> {
        let mut tx = self.db.pool.begin().await?;

        // SET does not take bind parameters
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", self.deadline.as_millis()))
            .execute(&mut *tx)
            .await?;

        let taken: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT bs.seat_id
            FROM booking_seats bs
            JOIN bookings b ON b.booking_id = bs.booking_id
            WHERE b.showtime_id = $1
              AND bs.seat_id = ANY($2)
              AND NOT bs.released
              AND b.payment_status <> 'Cancelled'
            ORDER BY bs.seat_id
            "#,
        )
        .bind(showtime.id)
        .bind(seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        if !taken.is_empty() {
            warn!("Seats {:?} already booked for showtime {}", taken, showtime.id);
            return Err(AppError::SeatsAlreadyBooked { showtime_id: showtime.id, seat_ids: taken });
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (user_id, showtime_id, screen_id, total_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(showtime.id)
        .bind(showtime.screen_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query_as::<_, BookingSeat>(
            r#"
            INSERT INTO booking_seats (booking_id, seat_id, showtime_id)
            SELECT $1, seat_id, $2 FROM UNNEST($3::BIGINT[]) AS seat_id
            RETURNING *
            "#,
        )
        .bind(booking.booking_id)
        .bind(showtime.id)
        .bind(seat_ids)
        .fetch_all(&mut *tx)
        .await;

        let seats = match inserted {
            Ok(seats) => seats,
            Err(e) if is_unique_violation(&e, OCCUPANCY_IDX) => {
                // Lost the race to a transaction that committed after our re-check
                warn!("Occupancy conflict on showtime {} for seats {:?}", showtime.id, seat_ids);
                return Err(AppError::SeatsAlreadyBooked {
                    showtime_id: showtime.id,
                    seat_ids: seat_ids.to_vec(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        debug!("Booking {} holds seats {:?}", booking.booking_id, seat_ids);
        info!(
            "Created booking {} for user {} on showtime {}: {} seats, total {:.2}",
            booking.booking_id,
            user_id,
            showtime.id,
            seats.len(),
            booking.total_amount
        );
        Ok(BookingWithSeats { booking, seats })
    }
}

fn is_statement_timeout_error(err: &AppError) -> bool {
    matches!(err, AppError::Database(e) if is_statement_timeout(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityStatus;
    use chrono::Utc;

    fn seat(id: i64, price: f64) -> Seat {
        Seat {
            id,
            screen_id: 1,
            seat_number: format!("A{}", id),
            row_label: "A".into(),
            column_number: id as i32,
            seat_category_id: 1,
            category_price: price,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_seat_ids_are_collapsed_and_sorted() {
        assert_eq!(normalize_seat_ids(&[5, 2, 5, 9, 2]), vec![2, 5, 9]);
        assert!(normalize_seat_ids(&[]).is_empty());
    }

    #[test]
    fn total_is_sum_of_category_prices() {
        assert_eq!(total_amount(&[seat(1, 10.0), seat(2, 12.0)]), 22.0);
        assert_eq!(total_amount(&[seat(1, 0.1), seat(2, 0.2)]), 0.3);
    }
}
