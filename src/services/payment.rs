//! Payment gateway collaborator.
//!
//! [`PaymentGatewayClient`] registers a pending booking with the external
//! gateway and checks payment status. Every call passes through a
//! [`CircuitBreaker`] so that an unavailable gateway is not hammered.
//! Gateway outcomes come back through the webhook and are applied to the
//! booking with [`apply_webhook`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, PaymentConfig};
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus};
use crate::services::lifecycle::BookingLifecycle;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment gateway temporarily unavailable")]
    CircuitOpen,

    #[error("payment gateway request failed: {0}")]
    Gateway(#[from] reqwest::Error),

    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are refused until the cool-down elapses.
    Open,
    /// One trial request is let through to probe the gateway.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    failure_threshold: u32,
    cool_down: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            cool_down,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.timeout_seconds))
    }

    // A poisoned lock still holds a valid state value
    fn read_state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: CircuitState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn cool_down_elapsed(&self) -> bool {
        let opened_at = *self.opened_at.lock().unwrap_or_else(|e| e.into_inner());
        opened_at.map_or(true, |at| at.elapsed() >= self.cool_down)
    }

    pub fn can_execute(&self) -> bool {
        match self.read_state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if self.cool_down_elapsed() {
                    self.set_state(CircuitState::HalfOpen);
                    info!("Circuit breaker moving to HalfOpen");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        if self.read_state() == CircuitState::HalfOpen {
            self.set_state(CircuitState::Closed);
            info!("Circuit breaker recovered, now Closed");
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        match self.read_state() {
            CircuitState::Closed if failures >= self.failure_threshold => {
                self.open();
                error!(
                    "Circuit breaker OPENED after {} failures (threshold {})",
                    failures, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!("Circuit breaker probe failed, back to Open");
            }
            _ => {}
        }
    }

    fn open(&self) {
        *self.opened_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        self.set_state(CircuitState::Open);
    }

    pub fn state(&self) -> CircuitState {
        self.read_state()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}

/* ---------- gateway API ---------- */

#[derive(Debug, Serialize)]
struct PaymentInitRequest {
    #[serde(rename = "teamSlug")]
    team_slug: String,
    token: String,
    amount: i64,
    #[serde(rename = "orderId")]
    order_id: String,
    currency: String,
    description: String,
    #[serde(rename = "successURL")]
    success_url: String,
    #[serde(rename = "failURL")]
    fail_url: String,
    #[serde(rename = "notificationURL")]
    notification_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitResponse {
    pub success: bool,
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    #[serde(rename = "paymentURL")]
    pub payment_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct PaymentCheckRequest {
    #[serde(rename = "teamSlug")]
    team_slug: String,
    token: String,
    #[serde(rename = "paymentId")]
    payment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCheckResponse {
    pub success: bool,
    pub status: Option<String>,
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub message: Option<String>,
}

/// Amount in minor currency units, as the gateway expects.
pub fn minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Clone)]
pub struct PaymentGatewayClient {
    team_slug: String,
    password: String,
    base_url: String,
    currency: String,
    success_url: String,
    fail_url: String,
    webhook_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl PaymentGatewayClient {
    pub fn from_config(config: &PaymentConfig, breaker: &CircuitBreakerConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            team_slug: config.merchant_id.clone(),
            password: config.merchant_password.clone(),
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            fail_url: config.fail_url.clone(),
            webhook_url: config.webhook_url.clone(),
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::from_config(breaker)),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn execute_with_circuit_breaker<F, T>(&self, operation: F) -> Result<T, PaymentError>
    where
        F: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN, refusing payment gateway request");
            return Err(PaymentError::CircuitOpen);
        }

        match operation.await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) => {
                error!("Payment gateway request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                Err(PaymentError::Gateway(e))
            }
        }
    }

    fn sign(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn init_token(&self, amount: i64, order_id: &str) -> String {
        Self::sign(&[&amount.to_string(), &self.currency, order_id, &self.password, &self.team_slug])
    }

    fn check_token(&self, payment_id: &str) -> String {
        Self::sign(&[payment_id, &self.password, &self.team_slug])
    }

    /// Registers `booking` with the gateway. The booking id is the order id
    /// the webhook later refers back to.
    pub async fn init_payment(&self, booking: &Booking) -> Result<PaymentInitResponse, PaymentError> {
        let amount = minor_units(booking.total_amount);
        let order_id = booking.booking_id.to_string();

        let request = PaymentInitRequest {
            team_slug: self.team_slug.clone(),
            token: self.init_token(amount, &order_id),
            amount,
            order_id,
            currency: self.currency.clone(),
            description: format!("Booking {} for showtime {}", booking.booking_id, booking.showtime_id),
            success_url: self.success_url.clone(),
            fail_url: self.fail_url.clone(),
            notification_url: self.webhook_url.clone(),
        };

        info!(
            "Initiating payment for booking {}: {} {} (breaker {:?})",
            booking.booking_id,
            amount,
            self.currency,
            self.circuit_breaker.state()
        );

        let operation = async {
            self.http_client
                .post(format!("{}/api/v1/PaymentInit/init", self.base_url))
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<PaymentInitResponse>()
                .await
        };

        let response = self.execute_with_circuit_breaker(operation).await?;
        if !response.success {
            return Err(PaymentError::Rejected(
                response.message.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(response)
    }

    pub async fn check_payment_status(&self, payment_id: &str) -> Result<PaymentCheckResponse, PaymentError> {
        let request = PaymentCheckRequest {
            team_slug: self.team_slug.clone(),
            token: self.check_token(payment_id),
            payment_id: payment_id.to_string(),
        };

        info!("Checking payment status: payment_id={}", payment_id);

        let operation = async {
            self.http_client
                .post(format!("{}/api/v1/PaymentCheck/check", self.base_url))
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<PaymentCheckResponse>()
                .await
        };

        self.execute_with_circuit_breaker(operation).await
    }
}

/* ---------- webhook ---------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhook {
    pub payment_id: String,
    pub order_id: String,
    pub status: String,
}

/// Booking status a gateway payment status leads to, if any.
pub fn booking_status_for(gateway_status: &str) -> Option<BookingStatus> {
    match gateway_status.trim().to_ascii_uppercase().as_str() {
        "CONFIRMED" => Some(BookingStatus::Confirmed),
        "CANCELLED" | "FAILED" | "EXPIRED" | "REJECTED" => Some(BookingStatus::Cancelled),
        _ => None,
    }
}

/// Applies a gateway notification to its booking. Returns the updated
/// booking, or `None` when the notification carries no transition.
/// Redelivery of a notification that was already applied is accepted.
pub async fn apply_webhook(lifecycle: &BookingLifecycle, webhook: &PaymentWebhook) -> AppResult<Option<Booking>> {
    let booking_id: i64 = webhook.order_id.trim().parse().map_err(|_| {
        AppError::InvalidInput(format!("order id '{}' is not a booking id", webhook.order_id))
    })?;

    let Some(status) = booking_status_for(&webhook.status) else {
        match webhook.status.trim().to_ascii_uppercase().as_str() {
            "NEW" | "AUTHORIZED" => {}
            other => warn!("Unknown payment status '{}' for payment {}", other, webhook.payment_id),
        }
        return Ok(None);
    };

    info!(
        "Payment {} for booking {} reported {}",
        webhook.payment_id, booking_id, webhook.status
    );

    match lifecycle.update_booking_status(booking_id, status).await {
        Ok(booking) => Ok(Some(booking)),
        Err(AppError::InvalidTransition { current, requested, .. }) if current == requested => {
            info!("Payment {} already applied to booking {}", webhook.payment_id, booking_id);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
