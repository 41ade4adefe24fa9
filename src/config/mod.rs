use serde::Deserialize;
use std::env;
use std::time::Duration;

// Top-level configuration container for every subsystem
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub payment: PaymentConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub limits: LimitsConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `pretty` or `json`
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub movie_ttl_secs: u64,
}

// Payment gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub merchant_id: String,
    pub merchant_password: String,
    pub gateway_url: String,
    pub success_url: String,
    pub fail_url: String,
    pub webhook_url: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

/// Per-owner ceilings enforced by the theater registry.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    pub max_theaters_per_owner_in_state: i64,
    pub max_theaters_per_owner_in_district: i64,
    pub max_theaters_per_owner_in_city: i64,
    pub max_theaters_per_owner_in_place: i64,
    pub max_screens_per_theater: i32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_theaters_per_owner_in_state: 50,
            max_theaters_per_owner_in_district: 20,
            max_theaters_per_owner_in_city: 10,
            max_theaters_per_owner_in_place: 5,
            max_screens_per_theater: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct BookingConfig {
    pub transaction_timeout_ms: u64,
    pub pending_ttl_minutes: i64,
    pub cleanup_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: 5000,
            pending_ttl_minutes: 15,
            cleanup_interval_secs: 60,
        }
    }
}

impl BookingConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Config {
    /// Builds the configuration from defaults overlaid with environment
    /// variables, using `__` between section and key (`DATABASE__URL`,
    /// `LIMITS__MAX_SCREENS_PER_THEATER`, ...). `RUST_LOG` is honoured as well.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let limits = LimitsConfig::default();
        let booking = BookingConfig::default();

        config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000_i64)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "movie_booking=debug,tower_http=debug")?
            .set_default("app.log_format", "pretty")?
            .set_default("database.pool_size", 20_i64)?
            .set_default("database.acquire_timeout_secs", 5_i64)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.movie_ttl_secs", 600_i64)?
            .set_default("payment.merchant_id", "")?
            .set_default("payment.merchant_password", "")?
            .set_default("payment.gateway_url", "https://gateway.example.com")?
            .set_default("payment.success_url", "https://example.com/payment/success")?
            .set_default("payment.fail_url", "https://example.com/payment/fail")?
            .set_default("payment.webhook_url", "https://example.com/api/payments/webhook")?
            .set_default("payment.currency", "INR")?
            .set_default("circuit_breaker.failure_threshold", 5_i64)?
            .set_default("circuit_breaker.timeout_seconds", 60_i64)?
            .set_default("limits.max_theaters_per_owner_in_state", limits.max_theaters_per_owner_in_state)?
            .set_default("limits.max_theaters_per_owner_in_district", limits.max_theaters_per_owner_in_district)?
            .set_default("limits.max_theaters_per_owner_in_city", limits.max_theaters_per_owner_in_city)?
            .set_default("limits.max_theaters_per_owner_in_place", limits.max_theaters_per_owner_in_place)?
            .set_default("limits.max_screens_per_theater", i64::from(limits.max_screens_per_theater))?
            .set_default("booking.transaction_timeout_ms", booking.transaction_timeout_ms)?
            .set_default("booking.pending_ttl_minutes", booking.pending_ttl_minutes)?
            .set_default("booking.cleanup_interval_secs", booking.cleanup_interval_secs)?
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .build()?
            .try_deserialize()
    }
}
