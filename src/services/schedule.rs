//! Showtimes and movie schedules.
//!
//! A showtime binds a movie to a screen at a date and time; the
//! (movie, screen, date, time) tuple is unique among active showtimes and is
//! what seat occupancy is scoped by. Schedules denormalize a showtime onto its
//! theater for browsing and follow the same tombstone/revive rules as theaters.

use tracing::info;

use crate::cache::CacheService;
use crate::database::{is_unique_violation, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Movie, MovieSchedule, NewMovieSchedule, NewShowtime, Showtime, Theater};
use crate::services::catalog::CatalogStore;
use crate::services::registry::{ensure_owner, CapacityRegistry};

const SHOWTIME_SLOT_IDX: &str = "showtimes_slot_idx";
const SCHEDULE_IDENTITY_IDX: &str = "movie_schedules_identity_idx";

#[derive(Clone)]
pub struct ScheduleRegistry {
    db: Database,
    registry: CapacityRegistry,
    catalog: CatalogStore,
    cache: Option<CacheService>,
}

impl ScheduleRegistry {
    pub fn new(db: Database, registry: CapacityRegistry, catalog: CatalogStore, cache: Option<CacheService>) -> Self {
        Self { db, registry, catalog, cache }
    }

    /// Movie lookup through the read-through cache when one is configured.
    pub async fn movie(&self, id: i64) -> AppResult<Movie> {
        let movie = match &self.cache {
            Some(cache) => cache.get_movie(id).await?,
            None => self.catalog.movie_by_id(id).await?,
        };
        movie.ok_or_else(|| AppError::NotFound(format!("movie {} not found", id)))
    }

    // Owner of the theater a screen belongs to, whatever the status of either
    async fn theater_of_screen(&self, screen_id: i64) -> AppResult<Theater> {
        sqlx::query_as::<_, Theater>(
            "SELECT t.* FROM theaters t JOIN theater_screens s ON s.theater_id = t.id WHERE s.id = $1",
        )
        .bind(screen_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("screen {} not found", screen_id)))
    }

    /* ---------- showtimes ---------- */

    pub async fn add_showtime(&self, owner_id: i64, new: &NewShowtime) -> AppResult<Showtime> {
        self.movie(new.movie_id).await?;
        let (screen, theater) = self.registry.screen_with_theater(new.screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM showtimes
                           WHERE movie_id = $1 AND screen_id = $2 AND show_date = $3 AND show_time = $4
                             AND status = 'active')",
        )
        .bind(new.movie_id)
        .bind(screen.id)
        .bind(new.show_date)
        .bind(new.show_time)
        .fetch_one(&self.db.pool)
        .await?;
        if taken {
            return Err(AppError::AlreadyExists(format!(
                "movie {} is already showing on screen {} at {} {}",
                new.movie_id, screen.id, new.show_date, new.show_time
            )));
        }

        let inserted = sqlx::query_as::<_, Showtime>(
            r#"
            INSERT INTO showtimes (movie_id, screen_id, show_date, show_time)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.movie_id)
        .bind(screen.id)
        .bind(new.show_date)
        .bind(new.show_time)
        .fetch_one(&self.db.pool)
        .await;

        match inserted {
            Ok(showtime) => {
                info!(
                    "Added showtime {} for movie {} on screen {} at {} {}",
                    showtime.id, showtime.movie_id, showtime.screen_id, showtime.show_date, showtime.show_time
                );
                Ok(showtime)
            }
            Err(e) if is_unique_violation(&e, SHOWTIME_SLOT_IDX) => Err(AppError::AlreadyExists(format!(
                "movie {} is already showing on screen {} at {} {}",
                new.movie_id, screen.id, new.show_date, new.show_time
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn showtime(&self, id: i64) -> AppResult<Showtime> {
        sqlx::query_as::<_, Showtime>("SELECT * FROM showtimes WHERE id = $1 AND status = 'active'")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("showtime {} not found", id)))
    }

    pub async fn list_showtimes_by_movie(&self, movie_id: i64) -> AppResult<Vec<Showtime>> {
        self.movie(movie_id).await?;
        let showtimes = sqlx::query_as::<_, Showtime>(
            "SELECT * FROM showtimes WHERE movie_id = $1 AND status = 'active' ORDER BY show_date, show_time, id",
        )
        .bind(movie_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(showtimes)
    }

    pub async fn delete_showtime(&self, owner_id: i64, id: i64) -> AppResult<()> {
        let showtime = self.showtime(id).await?;
        let theater = self.theater_of_screen(showtime.screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        sqlx::query("UPDATE showtimes SET status = 'tombstoned' WHERE id = $1")
            .bind(showtime.id)
            .execute(&self.db.pool)
            .await?;

        info!("Tombstoned showtime {}", showtime.id);
        Ok(())
    }

    /* ---------- schedules ---------- */

    /// Publishes a showtime under its theater. The showtime must play the
    /// given movie on a screen of the given theater.
    pub async fn add_movie_schedule(&self, owner_id: i64, new: &NewMovieSchedule) -> AppResult<MovieSchedule> {
        self.movie(new.movie_id).await?;
        let theater = self.registry.theater(new.theater_id).await?;
        let showtime = self.showtime(new.showtime_id).await?;
        ensure_owner(&theater, owner_id)?;

        if showtime.movie_id != new.movie_id {
            return Err(AppError::InvalidInput(format!(
                "showtime {} plays movie {}, not movie {}",
                showtime.id, showtime.movie_id, new.movie_id
            )));
        }
        let screen_theater = self.theater_of_screen(showtime.screen_id).await?;
        if screen_theater.id != theater.id {
            return Err(AppError::InvalidInput(format!(
                "showtime {} is not on a screen of theater {}",
                showtime.id, theater.id
            )));
        }

        let existing = sqlx::query_as::<_, MovieSchedule>(
            "SELECT * FROM movie_schedules WHERE movie_id = $1 AND theater_id = $2 AND showtime_id = $3",
        )
        .bind(new.movie_id)
        .bind(theater.id)
        .bind(showtime.id)
        .fetch_optional(&self.db.pool)
        .await?;

        match existing {
            Some(schedule) if schedule.status.is_active() => Err(AppError::AlreadyExists(format!(
                "showtime {} is already scheduled at theater {}",
                showtime.id, theater.id
            ))),
            Some(schedule) => {
                let revived = sqlx::query_as::<_, MovieSchedule>(
                    "UPDATE movie_schedules SET status = 'active'
                     WHERE id = $1 AND status = 'tombstoned'
                     RETURNING *",
                )
                .bind(schedule.id)
                .fetch_optional(&self.db.pool)
                .await?
                .ok_or_else(|| {
                    AppError::AlreadyExists(format!(
                        "showtime {} is already scheduled at theater {}",
                        showtime.id, theater.id
                    ))
                })?;
                info!("Revived schedule {} for showtime {}", revived.id, showtime.id);
                Ok(revived)
            }
            None => {
                let inserted = sqlx::query_as::<_, MovieSchedule>(
                    "INSERT INTO movie_schedules (movie_id, theater_id, showtime_id)
                     VALUES ($1, $2, $3)
                     RETURNING *",
                )
                .bind(new.movie_id)
                .bind(theater.id)
                .bind(showtime.id)
                .fetch_one(&self.db.pool)
                .await;

                match inserted {
                    Ok(schedule) => {
                        info!("Scheduled showtime {} at theater {}", showtime.id, theater.id);
                        Ok(schedule)
                    }
                    Err(e) if is_unique_violation(&e, SCHEDULE_IDENTITY_IDX) => {
                        Err(AppError::AlreadyExists(format!(
                            "showtime {} is already scheduled at theater {}",
                            showtime.id, theater.id
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    pub async fn list_schedules_by_theater(&self, theater_id: i64) -> AppResult<Vec<MovieSchedule>> {
        let theater = self.registry.theater(theater_id).await?;
        let schedules = sqlx::query_as::<_, MovieSchedule>(
            r#"
            SELECT ms.*
            FROM movie_schedules ms
            JOIN showtimes st ON st.id = ms.showtime_id
            WHERE ms.theater_id = $1 AND ms.status = 'active' AND st.status = 'active'
            ORDER BY st.show_date, st.show_time, ms.id
            "#,
        )
        .bind(theater.id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(schedules)
    }

    pub async fn delete_movie_schedule(&self, owner_id: i64, id: i64) -> AppResult<()> {
        let schedule = sqlx::query_as::<_, MovieSchedule>(
            "SELECT * FROM movie_schedules WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("schedule {} not found", id)))?;

        let theater = sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE id = $1")
            .bind(schedule.theater_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("theater {} not found", schedule.theater_id)))?;
        ensure_owner(&theater, owner_id)?;

        sqlx::query("UPDATE movie_schedules SET status = 'tombstoned' WHERE id = $1")
            .bind(schedule.id)
            .execute(&self.db.pool)
            .await?;

        info!("Tombstoned schedule {}", schedule.id);
        Ok(())
    }
}
