use crate::{database::Database, redis_client::RedisClient};
use tracing::info;

pub mod movies;

/// Best-effort read-through cache in front of Postgres. Redis failures never
/// surface to callers; they are logged and the database answers instead.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    movie_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, movie_ttl_secs: u64) -> Self {
        Self { redis, db, movie_ttl_secs }
    }

    // Warm the cache at startup
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");
        let loaded = self.warm_recent_movies().await;
        info!("Cache warmup done, {} movies cached", loaded);
    }
}
