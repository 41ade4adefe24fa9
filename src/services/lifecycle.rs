//! Booking state machine and read path.
//!
//! `Pending` moves to `Confirmed` or `Cancelled` exactly once, through a
//! guarded update that only matches rows still in `Pending`. Cancelling a
//! booking releases its seats in the same transaction, which takes them out
//! of the occupancy index and makes them bookable again.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingSeat, BookingStatus, BookingWithSeats};

#[derive(Clone)]
pub struct BookingLifecycle {
    db: Database,
}

impl BookingLifecycle {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn booking_row(&self, booking_id: i64) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))
    }

    pub async fn get_booking(&self, booking_id: i64) -> AppResult<BookingWithSeats> {
        let booking = self.booking_row(booking_id).await?;
        let seats = sqlx::query_as::<_, BookingSeat>(
            "SELECT * FROM booking_seats WHERE booking_id = $1 ORDER BY seat_id",
        )
        .bind(booking.booking_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(BookingWithSeats { booking, seats })
    }

    /// Every booking of `user_id`, newest first. Having none is reported as
    /// `NotFound`.
    pub async fn list_bookings_by_user(&self, user_id: i64) -> AppResult<Vec<BookingWithSeats>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY booking_date DESC, booking_id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        if bookings.is_empty() {
            return Err(AppError::NotFound(format!("no bookings found for user {}", user_id)));
        }

        let ids: Vec<i64> = bookings.iter().map(|b| b.booking_id).collect();
        let seats = sqlx::query_as::<_, BookingSeat>(
            "SELECT * FROM booking_seats WHERE booking_id = ANY($1) ORDER BY booking_id, seat_id",
        )
        .bind(&ids)
        .fetch_all(&self.db.pool)
        .await?;

        let mut by_booking: HashMap<i64, Vec<BookingSeat>> = HashMap::new();
        for seat in seats {
            by_booking.entry(seat.booking_id).or_default().push(seat);
        }

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let seats = by_booking.remove(&booking.booking_id).unwrap_or_default();
                BookingWithSeats { booking, seats }
            })
            .collect())
    }

    /// Compare-and-set from `Pending` to `status`.
    pub async fn update_booking_status(&self, booking_id: i64, status: BookingStatus) -> AppResult<Booking> {
        if !BookingStatus::Pending.can_transition_to(status) {
            return Err(AppError::InvalidInput(format!(
                "bookings can only move to Confirmed or Cancelled, not {}",
                status
            )));
        }

        let mut tx = self.db.pool.begin().await?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET payment_status = $2
            WHERE booking_id = $1 AND payment_status = 'Pending'
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?;

        let booking = match updated {
            Some(booking) => booking,
            None => {
                let current: Option<BookingStatus> =
                    sqlx::query_scalar("SELECT payment_status FROM bookings WHERE booking_id = $1")
                        .bind(booking_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match current {
                    Some(current) => AppError::InvalidTransition { booking_id, current, requested: status },
                    None => AppError::NotFound(format!("booking {} not found", booking_id)),
                });
            }
        };

        if status == BookingStatus::Cancelled {
            let released = sqlx::query("UPDATE booking_seats SET released = TRUE WHERE booking_id = $1")
                .bind(booking_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            info!("Released {} seats of booking {}", released, booking_id);
        }

        tx.commit().await?;

        info!("Booking {} moved to {}", booking_id, status);
        Ok(booking)
    }

    /// Cancellation requested by the booking's own user.
    pub async fn cancel_booking(&self, user_id: i64, booking_id: i64) -> AppResult<Booking> {
        let booking = self.booking_row(booking_id).await?;
        if booking.user_id != user_id {
            return Err(AppError::Unauthorized(format!(
                "booking {} does not belong to user {}",
                booking_id, user_id
            )));
        }
        self.update_booking_status(booking_id, BookingStatus::Cancelled).await
    }

    /// Removes the booking and its seat rows together, freeing the seats.
    pub async fn delete_booking(&self, booking_id: i64) -> AppResult<()> {
        let mut tx = self.db.pool.begin().await?;

        let seats = sqlx::query("DELETE FROM booking_seats WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound(format!("booking {} not found", booking_id)));
        }

        tx.commit().await?;

        info!("Deleted booking {} and {} seat rows", booking_id, seats);
        Ok(())
    }

    /// Cancels every booking left in `Pending` for longer than `ttl_minutes`
    /// and releases its seats. Returns the number of bookings expired.
    pub async fn expire_pending_bookings(&self, ttl_minutes: i64) -> AppResult<u64> {
        let mut tx = self.db.pool.begin().await?;

        let expired: Vec<i64> = sqlx::query_scalar(
            r#"
            UPDATE bookings
            SET payment_status = 'Cancelled'
            WHERE payment_status = 'Pending'
              AND booking_date < NOW() - make_interval(mins => $1::INT)
            RETURNING booking_id
            "#,
        )
        .bind(ttl_minutes)
        .fetch_all(&mut *tx)
        .await?;

        if expired.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        sqlx::query("UPDATE booking_seats SET released = TRUE WHERE booking_id = ANY($1)")
            .bind(&expired)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        warn!("Expired {} pending bookings older than {} minutes", expired.len(), ttl_minutes);
        Ok(expired.len() as u64)
    }
}
