//! Theater, screen and seat registry.
//!
//! Owns the rows that become bookable inventory. Every mutation is gated by
//! an owner check, and theater creation is bounded by per-owner locality
//! ceilings from [`LimitsConfig`]. Theaters and seats are tombstoned instead of
//! removed; registering the same identity again revives the original row.
//!
//! Locality quotas are check-then-write: they are per-owner counts and two
//! racing registrations by the same owner can overshoot a ceiling by one.
//! Identity duplicates cannot slip through, they are backed by unique indexes.

use std::collections::{BTreeSet, HashSet};

use tracing::{info, warn};

use crate::config::LimitsConfig;
use crate::database::{is_unique_violation, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateSeatsRequest, NewTheater, NewTheaterScreen, Seat, Theater, TheaterScreen,
    TheaterScreenUpdate, TheaterUpdate,
};
use crate::services::catalog::CatalogStore;
use crate::services::layout::expand_bands;

const THEATER_IDENTITY_IDX: &str = "theaters_identity_idx";
const SCREEN_NUMBER_IDX: &str = "theater_screens_number_idx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locality {
    State,
    District,
    City,
    Place,
}

impl Locality {
    const ALL: [Locality; 4] = [Locality::State, Locality::District, Locality::City, Locality::Place];

    fn column(self) -> &'static str {
        match self {
            Locality::State => "state",
            Locality::District => "district",
            Locality::City => "city",
            Locality::Place => "place",
        }
    }

    fn limit(self, limits: &LimitsConfig) -> i64 {
        match self {
            Locality::State => limits.max_theaters_per_owner_in_state,
            Locality::District => limits.max_theaters_per_owner_in_district,
            Locality::City => limits.max_theaters_per_owner_in_city,
            Locality::Place => limits.max_theaters_per_owner_in_place,
        }
    }

    fn of_new(self, theater: &NewTheater) -> &str {
        match self {
            Locality::State => &theater.state,
            Locality::District => &theater.district,
            Locality::City => &theater.city,
            Locality::Place => &theater.place,
        }
    }

    fn of_existing(self, theater: &Theater) -> &str {
        match self {
            Locality::State => &theater.state,
            Locality::District => &theater.district,
            Locality::City => &theater.city,
            Locality::Place => &theater.place,
        }
    }

    fn of_update(self, update: &TheaterUpdate) -> Option<&str> {
        match self {
            Locality::State => update.state(),
            Locality::District => update.district(),
            Locality::City => update.city(),
            Locality::Place => update.place(),
        }
    }
}

pub(crate) fn ensure_owner(theater: &Theater, owner_id: i64) -> AppResult<()> {
    if theater.owner_id != owner_id {
        return Err(AppError::Unauthorized(format!(
            "user {} is not the owner of theater {}",
            owner_id, theater.id
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CapacityRegistry {
    db: Database,
    catalog: CatalogStore,
    limits: LimitsConfig,
}

impl CapacityRegistry {
    pub fn new(db: Database, catalog: CatalogStore, limits: LimitsConfig) -> Self {
        Self { db, catalog, limits }
    }

    /* ---------- theaters ---------- */

    pub async fn theater(&self, id: i64) -> AppResult<Theater> {
        sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE id = $1 AND status = 'active'")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("theater {} not found", id)))
    }

    async fn find_theater_by_identity(&self, name: &str, place: &str, city: &str) -> AppResult<Option<Theater>> {
        let theater = sqlx::query_as::<_, Theater>(
            "SELECT * FROM theaters
             WHERE lower(name) = lower($1) AND lower(place) = lower($2) AND lower(city) = lower($3)",
        )
        .bind(name)
        .bind(place)
        .bind(city)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(theater)
    }

    async fn check_locality_quota(&self, owner_id: i64, locality: Locality, value: &str) -> AppResult<()> {
        let sql = format!(
            "SELECT COUNT(*) FROM theaters WHERE owner_id = $1 AND lower({}) = lower($2) AND status = 'active'",
            locality.column()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(owner_id)
            .bind(value)
            .fetch_one(&self.db.pool)
            .await?;

        let limit = locality.limit(&self.limits);
        if count >= limit {
            warn!(
                "Owner {} hit the {} ceiling ({}) for '{}'",
                owner_id,
                locality.column(),
                limit,
                value
            );
            return Err(AppError::QuotaExceeded(format!(
                "owner {} has reached the maximum of {} theaters in {} '{}'",
                owner_id,
                limit,
                locality.column(),
                value
            )));
        }
        Ok(())
    }

    fn check_screen_count(&self, number_of_screens: i32) -> AppResult<()> {
        if number_of_screens < 1 {
            return Err(AppError::InvalidInput("number_of_screens must be at least 1".to_string()));
        }
        if number_of_screens > self.limits.max_screens_per_theater {
            return Err(AppError::QuotaExceeded(format!(
                "a theater may have at most {} screens, got {}",
                self.limits.max_screens_per_theater, number_of_screens
            )));
        }
        Ok(())
    }

    /// Registers a theater, or revives a tombstoned one with the same
    /// (name, place, city). Only the tombstoned theater's owner may revive it.
    pub async fn add_theater(&self, owner_id: i64, new: &NewTheater) -> AppResult<Theater> {
        if self.catalog.theater_type(new.theater_type_id).await?.is_none() {
            return Err(AppError::InvalidInput(format!(
                "theater type {} does not exist",
                new.theater_type_id
            )));
        }
        self.check_screen_count(new.number_of_screens)?;

        for locality in Locality::ALL {
            self.check_locality_quota(owner_id, locality, locality.of_new(new)).await?;
        }

        match self.find_theater_by_identity(&new.name, &new.place, &new.city).await? {
            Some(existing) if existing.status.is_active() => Err(AppError::AlreadyExists(format!(
                "theater '{}' already exists in {}, {}",
                new.name, new.place, new.city
            ))),
            Some(tombstoned) if tombstoned.owner_id != owner_id => {
                warn!(
                    "Owner {} tried to revive theater {} owned by {}",
                    owner_id, tombstoned.id, tombstoned.owner_id
                );
                Err(AppError::AlreadyExists(format!(
                    "theater '{}' already exists in {}, {}",
                    new.name, new.place, new.city
                )))
            }
            Some(tombstoned) => self.revive_theater(owner_id, tombstoned.id, new).await,
            None => self.insert_theater(owner_id, new).await,
        }
    }

    async fn revive_theater(&self, owner_id: i64, id: i64, new: &NewTheater) -> AppResult<Theater> {
        let revived = sqlx::query_as::<_, Theater>(
            r#"
            UPDATE theaters
            SET status = 'active', district = $3, state = $4,
                number_of_screens = $5, theater_type_id = $6, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND status = 'tombstoned'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&new.district)
        .bind(&new.state)
        .bind(new.number_of_screens)
        .bind(new.theater_type_id)
        .fetch_optional(&self.db.pool)
        .await?;

        match revived {
            Some(theater) => {
                info!("Revived theater {} '{}' for owner {}", theater.id, theater.name, owner_id);
                Ok(theater)
            }
            // Someone else revived it between our lookup and the update
            None => Err(AppError::AlreadyExists(format!(
                "theater '{}' already exists in {}, {}",
                new.name, new.place, new.city
            ))),
        }
    }

    async fn insert_theater(&self, owner_id: i64, new: &NewTheater) -> AppResult<Theater> {
        let inserted = sqlx::query_as::<_, Theater>(
            r#"
            INSERT INTO theaters (name, place, city, district, state, owner_id, number_of_screens, theater_type_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.place)
        .bind(&new.city)
        .bind(&new.district)
        .bind(&new.state)
        .bind(owner_id)
        .bind(new.number_of_screens)
        .bind(new.theater_type_id)
        .fetch_one(&self.db.pool)
        .await;

        match inserted {
            Ok(theater) => {
                info!("Registered theater {} '{}' for owner {}", theater.id, theater.name, owner_id);
                Ok(theater)
            }
            Err(e) if is_unique_violation(&e, THEATER_IDENTITY_IDX) => Err(AppError::AlreadyExists(format!(
                "theater '{}' already exists in {}, {}",
                new.name, new.place, new.city
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies the non-empty fields of `update`. Locality quotas are checked
    /// only for localities that actually change.
    pub async fn update_theater(&self, owner_id: i64, theater_id: i64, update: &TheaterUpdate) -> AppResult<Theater> {
        let current = self.theater(theater_id).await?;
        ensure_owner(&current, owner_id)?;

        let name = update.name().unwrap_or(&current.name).to_string();
        let place = update.place().unwrap_or(&current.place).to_string();
        let city = update.city().unwrap_or(&current.city).to_string();

        let identity_changed = !name.eq_ignore_ascii_case(&current.name)
            || !place.eq_ignore_ascii_case(&current.place)
            || !city.eq_ignore_ascii_case(&current.city);
        if identity_changed {
            if let Some(other) = self.find_theater_by_identity(&name, &place, &city).await? {
                if other.id != current.id {
                    return Err(AppError::AlreadyExists(format!(
                        "another theater named '{}' already exists in {}, {}",
                        name, place, city
                    )));
                }
            }
        }

        for locality in Locality::ALL {
            if let Some(value) = locality.of_update(update) {
                if !value.eq_ignore_ascii_case(locality.of_existing(&current)) {
                    self.check_locality_quota(current.owner_id, locality, value).await?;
                }
            }
        }

        let theater_type_id = match update.theater_type_id() {
            Some(type_id) => {
                if self.catalog.theater_type(type_id).await?.is_none() {
                    return Err(AppError::InvalidInput(format!("theater type {} does not exist", type_id)));
                }
                type_id
            }
            None => current.theater_type_id,
        };

        let number_of_screens = match update.number_of_screens() {
            Some(n) => {
                self.check_screen_count(n)?;
                n
            }
            None => current.number_of_screens,
        };

        let updated = sqlx::query_as::<_, Theater>(
            r#"
            UPDATE theaters
            SET name = $2, place = $3, city = $4, district = $5, state = $6,
                number_of_screens = $7, theater_type_id = $8, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(&name)
        .bind(&place)
        .bind(&city)
        .bind(update.district().unwrap_or(&current.district))
        .bind(update.state().unwrap_or(&current.state))
        .bind(number_of_screens)
        .bind(theater_type_id)
        .fetch_optional(&self.db.pool)
        .await;

        match updated {
            Ok(Some(theater)) => {
                info!("Updated theater {}", theater.id);
                Ok(theater)
            }
            Ok(None) => Err(AppError::NotFound(format!("theater {} not found", theater_id))),
            Err(e) if is_unique_violation(&e, THEATER_IDENTITY_IDX) => Err(AppError::AlreadyExists(format!(
                "another theater named '{}' already exists in {}, {}",
                name, place, city
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Tombstones the theater. Its screens and seats are left as they are.
    pub async fn delete_theater(&self, owner_id: i64, theater_id: i64) -> AppResult<()> {
        let theater = self.theater(theater_id).await?;
        ensure_owner(&theater, owner_id)?;

        sqlx::query("UPDATE theaters SET status = 'tombstoned', updated_at = NOW() WHERE id = $1")
            .bind(theater.id)
            .execute(&self.db.pool)
            .await?;

        info!("Tombstoned theater {}", theater.id);
        Ok(())
    }

    /* ---------- screens ---------- */

    pub async fn screen(&self, id: i64) -> AppResult<TheaterScreen> {
        sqlx::query_as::<_, TheaterScreen>("SELECT * FROM theater_screens WHERE id = $1 AND status = 'active'")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("screen {} not found", id)))
    }

    /// Active screen together with its (active) theater.
    pub async fn screen_with_theater(&self, screen_id: i64) -> AppResult<(TheaterScreen, Theater)> {
        let screen = self.screen(screen_id).await?;
        let theater = self.theater(screen.theater_id).await?;
        Ok((screen, theater))
    }

    async fn screen_number_taken(&self, theater_id: i64, screen_number: i32) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM theater_screens
                           WHERE theater_id = $1 AND screen_number = $2 AND status = 'active')",
        )
        .bind(theater_id)
        .bind(screen_number)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(taken)
    }

    fn check_screen_number(&self, screen_number: i32) -> AppResult<()> {
        if screen_number < 1 {
            return Err(AppError::InvalidInput("screen_number must be at least 1".to_string()));
        }
        if screen_number > self.limits.max_screens_per_theater {
            return Err(AppError::QuotaExceeded(format!(
                "screen number {} exceeds the maximum of {} screens per theater",
                screen_number, self.limits.max_screens_per_theater
            )));
        }
        Ok(())
    }

    pub async fn add_theater_screen(
        &self,
        owner_id: i64,
        theater_id: i64,
        new: &NewTheaterScreen,
    ) -> AppResult<TheaterScreen> {
        let theater = self.theater(theater_id).await?;
        if self.catalog.screen_type(new.screen_type_id).await?.is_none() {
            return Err(AppError::NotFound(format!("screen type {} not found", new.screen_type_id)));
        }
        ensure_owner(&theater, owner_id)?;

        if new.seat_capacity < 1 {
            return Err(AppError::InvalidInput("seat_capacity must be at least 1".to_string()));
        }
        if self.screen_number_taken(theater.id, new.screen_number).await? {
            return Err(AppError::AlreadyExists(format!(
                "screen {} already exists in theater {}",
                new.screen_number, theater.id
            )));
        }
        self.check_screen_number(new.screen_number)?;

        let inserted = sqlx::query_as::<_, TheaterScreen>(
            r#"
            INSERT INTO theater_screens (theater_id, screen_number, seat_capacity, screen_type_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(theater.id)
        .bind(new.screen_number)
        .bind(new.seat_capacity)
        .bind(new.screen_type_id)
        .fetch_one(&self.db.pool)
        .await;

        match inserted {
            Ok(screen) => {
                info!("Added screen {} (#{}) to theater {}", screen.id, screen.screen_number, theater.id);
                Ok(screen)
            }
            Err(e) if is_unique_violation(&e, SCREEN_NUMBER_IDX) => Err(AppError::AlreadyExists(format!(
                "screen {} already exists in theater {}",
                new.screen_number, theater.id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn active_seat_count(&self, screen_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM seats WHERE screen_id = $1 AND status = 'active'",
        )
        .bind(screen_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }

    pub async fn update_theater_screen(
        &self,
        owner_id: i64,
        screen_id: i64,
        update: &TheaterScreenUpdate,
    ) -> AppResult<TheaterScreen> {
        let (current, theater) = self.screen_with_theater(screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        let screen_number = match update.screen_number.filter(|n| *n != current.screen_number) {
            Some(n) => {
                self.check_screen_number(n)?;
                if self.screen_number_taken(theater.id, n).await? {
                    return Err(AppError::AlreadyExists(format!(
                        "screen {} already exists in theater {}",
                        n, theater.id
                    )));
                }
                n
            }
            None => current.screen_number,
        };

        let seat_capacity = match update.seat_capacity.filter(|c| *c != current.seat_capacity) {
            Some(capacity) => {
                let seats = self.active_seat_count(current.id).await?;
                if capacity < 1 || i64::from(capacity) < seats {
                    return Err(AppError::InvalidInput(format!(
                        "seat_capacity {} is below the {} seats already on screen {}",
                        capacity, seats, current.id
                    )));
                }
                capacity
            }
            None => current.seat_capacity,
        };

        let screen_type_id = match update.screen_type_id.filter(|id| *id != 0) {
            Some(type_id) => {
                if self.catalog.screen_type(type_id).await?.is_none() {
                    return Err(AppError::NotFound(format!("screen type {} not found", type_id)));
                }
                type_id
            }
            None => current.screen_type_id,
        };

        let updated = sqlx::query_as::<_, TheaterScreen>(
            r#"
            UPDATE theater_screens
            SET screen_number = $2, seat_capacity = $3, screen_type_id = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(screen_number)
        .bind(seat_capacity)
        .bind(screen_type_id)
        .fetch_optional(&self.db.pool)
        .await;

        match updated {
            Ok(Some(screen)) => {
                info!("Updated screen {}", screen.id);
                Ok(screen)
            }
            Ok(None) => Err(AppError::NotFound(format!("screen {} not found", screen_id))),
            Err(e) if is_unique_violation(&e, SCREEN_NUMBER_IDX) => Err(AppError::AlreadyExists(format!(
                "screen {} already exists in theater {}",
                screen_number, theater.id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_theater_screen(&self, owner_id: i64, screen_id: i64) -> AppResult<()> {
        let (screen, theater) = self.screen_with_theater(screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        sqlx::query("UPDATE theater_screens SET status = 'tombstoned', updated_at = NOW() WHERE id = $1")
            .bind(screen.id)
            .execute(&self.db.pool)
            .await?;

        info!("Tombstoned screen {} of theater {}", screen.id, theater.id);
        Ok(())
    }

    /* ---------- seats ---------- */

    /// Expands the band layout into seats on `screen_id`. The batch is
    /// all-or-nothing: tombstoned seats with a matching number are revived,
    /// an active duplicate aborts the whole request.
    pub async fn create_seats(&self, owner_id: i64, screen_id: i64, req: &CreateSeatsRequest) -> AppResult<Vec<Seat>> {
        let (screen, theater) = self.screen_with_theater(screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        let cells = expand_bands(req.total_columns, &req.bands)?;

        let categories: BTreeSet<i64> = cells.iter().map(|c| c.seat_category_id).collect();
        for category_id in categories {
            if self.catalog.seat_category(category_id).await?.is_none() {
                return Err(AppError::NotFound(format!("seat category {} not found", category_id)));
            }
        }

        let mut tx = self.db.pool.begin().await?;

        // Serializes concurrent layout changes on the same screen
        sqlx::query("SELECT id FROM theater_screens WHERE id = $1 FOR UPDATE")
            .bind(screen.id)
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seats WHERE screen_id = $1 AND status = 'active'")
            .bind(screen.id)
            .fetch_one(&mut *tx)
            .await?;

        let requested = cells.len() as i64;
        if existing + requested > i64::from(screen.seat_capacity) {
            return Err(AppError::QuotaExceeded(format!(
                "screen {} holds {} seats; {} exist and {} were requested",
                screen.id, screen.seat_capacity, existing, requested
            )));
        }

        let numbers: Vec<String> = cells.iter().map(|c| c.seat_number.clone()).collect();
        let rows: Vec<String> = cells.iter().map(|c| c.row_label.clone()).collect();
        let columns: Vec<i32> = cells.iter().map(|c| c.column_number).collect();
        let category_ids: Vec<i64> = cells.iter().map(|c| c.seat_category_id).collect();
        let prices: Vec<f64> = cells.iter().map(|c| c.price).collect();

        let seats = sqlx::query_as::<_, Seat>(
            r#"
            INSERT INTO seats (screen_id, seat_number, row_label, column_number, seat_category_id, category_price)
            SELECT $1, n, r, c, cat, p
            FROM UNNEST($2::TEXT[], $3::TEXT[], $4::INT[], $5::BIGINT[], $6::FLOAT8[]) AS t(n, r, c, cat, p)
            ON CONFLICT (screen_id, seat_number) DO UPDATE
            SET status = 'active',
                row_label = EXCLUDED.row_label,
                column_number = EXCLUDED.column_number,
                seat_category_id = EXCLUDED.seat_category_id,
                category_price = EXCLUDED.category_price,
                updated_at = NOW()
            WHERE seats.status = 'tombstoned'
            RETURNING *
            "#,
        )
        .bind(screen.id)
        .bind(&numbers)
        .bind(&rows)
        .bind(&columns)
        .bind(&category_ids)
        .bind(&prices)
        .fetch_all(&mut *tx)
        .await?;

        if seats.len() != cells.len() {
            let written: HashSet<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
            let duplicates: Vec<&str> = numbers
                .iter()
                .map(String::as_str)
                .filter(|n| !written.contains(n))
                .collect();
            // Dropping the transaction rolls the batch back
            return Err(AppError::AlreadyExists(format!(
                "seats {} already exist on screen {}",
                duplicates.join(", "),
                screen.id
            )));
        }

        tx.commit().await?;

        info!("Created {} seats on screen {} of theater {}", seats.len(), screen.id, theater.id);
        Ok(seats)
    }

    pub async fn list_seats(&self, screen_id: i64) -> AppResult<Vec<Seat>> {
        let screen = self.screen(screen_id).await?;
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT * FROM seats WHERE screen_id = $1 AND status = 'active' ORDER BY row_label, column_number",
        )
        .bind(screen.id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    pub async fn delete_seat(&self, owner_id: i64, seat_id: i64) -> AppResult<()> {
        let seat = sqlx::query_as::<_, Seat>("SELECT * FROM seats WHERE id = $1 AND status = 'active'")
            .bind(seat_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("seat {} not found", seat_id)))?;
        let (_, theater) = self.screen_with_theater(seat.screen_id).await?;
        ensure_owner(&theater, owner_id)?;

        sqlx::query("UPDATE seats SET status = 'tombstoned', updated_at = NOW() WHERE id = $1")
            .bind(seat.id)
            .execute(&self.db.pool)
            .await?;

        info!("Tombstoned seat {} ({}) on screen {}", seat.id, seat.seat_number, seat.screen_id);
        Ok(())
    }
}
