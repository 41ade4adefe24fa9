use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::error::AppResult;
use crate::models::Movie;

const WARMUP_LIMIT: i64 = 100;

fn movie_key(id: i64) -> String {
    format!("movie:{}", id)
}

impl CacheService {
    /// Movie by id, from Redis when present, otherwise from Postgres (and
    /// then written back). `Ok(None)` means the movie does not exist.
    pub async fn get_movie(&self, id: i64) -> AppResult<Option<Movie>> {
        match self.get_movie_from_cache(id).await {
            Ok(Some(movie)) => {
                debug!("Movie {} served from cache", id);
                return Ok(Some(movie));
            }
            Ok(None) => {}
            Err(e) => warn!("Movie cache read failed for {}: {}", id, e),
        }

        let movie = self.load_movie_from_db(id).await?;
        if let Some(movie) = &movie {
            if let Err(e) = self.save_movie_to_cache(movie).await {
                warn!("Movie cache write failed for {}: {}", id, e);
            }
        }
        Ok(movie)
    }

    pub(super) async fn warm_recent_movies(&self) -> usize {
        let movies = match sqlx::query_as::<_, Movie>(
            "SELECT * FROM movies ORDER BY release_date DESC, id DESC LIMIT $1",
        )
        .bind(WARMUP_LIMIT)
        .fetch_all(&self.db.pool)
        .await
        {
            Ok(movies) => movies,
            Err(e) => {
                warn!("Cache warmup could not load movies: {}", e);
                return 0;
            }
        };

        let mut cached = 0;
        for movie in &movies {
            match self.save_movie_to_cache(movie).await {
                Ok(()) => cached += 1,
                Err(e) => {
                    warn!("Cache warmup stopped: {}", e);
                    break;
                }
            }
        }
        cached
    }

    async fn load_movie_from_db(&self, id: i64) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await
    }

    // === Redis ===

    async fn get_movie_from_cache(&self, id: i64) -> Result<Option<Movie>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(movie_key(id)).await?;
        match data {
            Some(data) => {
                let movie = serde_json::from_str(&data).map_err(|_| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
                })?;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }

    async fn save_movie_to_cache(&self, movie: &Movie) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(movie).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(movie_key(movie.id), data, self.movie_ttl_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::movie_key;

    #[test]
    fn movie_keys_are_namespaced() {
        assert_eq!(movie_key(42), "movie:42");
    }
}
