pub mod config;
pub mod database;
pub mod error;
pub mod redis_client;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;

use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use services::{
    catalog::CatalogStore, lifecycle::BookingLifecycle, payment::PaymentGatewayClient,
    registry::CapacityRegistry, reservation::ReservationEngine, schedule::ScheduleRegistry,
};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub catalog: CatalogStore,
    pub registry: CapacityRegistry,
    pub schedules: ScheduleRegistry,
    pub reservations: ReservationEngine,
    pub lifecycle: BookingLifecycle,
    pub payment: PaymentGatewayClient,
}

impl AppState {
    /// Connects to Postgres and Redis, applies migrations and wires every
    /// service onto the shared pool.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(
            &config.database.url,
            config.database.pool_size,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.redis.movie_ttl_secs);
        let catalog = CatalogStore::new(db.clone());
        let registry = CapacityRegistry::new(db.clone(), catalog.clone(), config.limits);
        let schedules = ScheduleRegistry::new(db.clone(), registry.clone(), catalog.clone(), Some(cache.clone()));
        let reservations = ReservationEngine::new(db.clone(), config.booking.transaction_timeout());
        let lifecycle = BookingLifecycle::new(db.clone());
        let payment = PaymentGatewayClient::from_config(&config.payment, &config.circuit_breaker)?;

        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            catalog,
            registry,
            schedules,
            reservations,
            lifecycle,
            payment,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warm the cache in the background
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
