use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::BookingConfig;
use crate::error::AppResult;
use crate::services::lifecycle::BookingLifecycle;

/// Periodically cancels bookings that stayed `Pending` past their TTL, which
/// releases their seats back into inventory.
pub struct CleanupService {
    lifecycle: BookingLifecycle,
    pending_ttl_minutes: i64,
    interval: Duration,
}

impl CleanupService {
    pub fn new(lifecycle: BookingLifecycle, config: &BookingConfig) -> Self {
        Self {
            lifecycle,
            pending_ttl_minutes: config.pending_ttl_minutes,
            interval: config.cleanup_interval(),
        }
    }

    /// One sweep. Returns how many bookings were expired.
    pub async fn run_once(&self) -> AppResult<u64> {
        let expired = self.lifecycle.expire_pending_bookings(self.pending_ttl_minutes).await?;
        if expired == 0 {
            debug!("No pending bookings past {} minutes", self.pending_ttl_minutes);
        }
        Ok(expired)
    }

    /// Runs forever; a failed sweep is logged and retried on the next tick.
    pub async fn run(self) {
        info!(
            "Booking cleanup every {:?}, pending TTL {} minutes",
            self.interval, self.pending_ttl_minutes
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!("Booking cleanup failed: {}", e);
            }
        }
    }
}
