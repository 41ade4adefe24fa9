//! Movie, theater type, screen type and seat category records.
//!
//! These are simple keyed tables; the only invariant is case-insensitive name
//! uniqueness for the three type tables.

use tracing::info;

use crate::database::{is_unique_violation, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Movie, NewMovie, ScreenType, SeatCategory, TheaterType};

#[derive(Clone)]
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn add_movie(&self, movie: &NewMovie) -> AppResult<Movie> {
        let created = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (title, description, duration_minutes, genre, release_date, rating, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.duration_minutes)
        .bind(&movie.genre)
        .bind(movie.release_date)
        .bind(movie.rating)
        .bind(&movie.language)
        .fetch_one(&self.db.pool)
        .await?;

        info!("Registered movie {} '{}'", created.id, created.title);
        Ok(created)
    }

    pub async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(movie)
    }

    pub async fn add_theater_type(&self, name: &str) -> AppResult<TheaterType> {
        self.insert_named("theater_types", "theater_types_name_idx", "theater type", name)
            .await
    }

    pub async fn add_screen_type(&self, name: &str) -> AppResult<ScreenType> {
        self.insert_named("screen_types", "screen_types_name_idx", "screen type", name)
            .await
    }

    pub async fn add_seat_category(&self, name: &str) -> AppResult<SeatCategory> {
        self.insert_named("seat_categories", "seat_categories_name_idx", "seat category", name)
            .await
    }

    pub async fn theater_type(&self, id: i64) -> AppResult<Option<TheaterType>> {
        self.find_named("theater_types", id).await
    }

    pub async fn screen_type(&self, id: i64) -> AppResult<Option<ScreenType>> {
        self.find_named("screen_types", id).await
    }

    pub async fn seat_category(&self, id: i64) -> AppResult<Option<SeatCategory>> {
        self.find_named("seat_categories", id).await
    }

    // `table` and `index` are always crate-internal literals
    async fn insert_named<T>(&self, table: &str, index: &str, label: &str, name: &str) -> AppResult<T>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(format!("{} name must not be empty", label)));
        }

        let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", table);
        match sqlx::query_as::<_, T>(&sql).bind(name).fetch_one(&self.db.pool).await {
            Ok(row) => {
                info!("Added {} '{}'", label, name);
                Ok(row)
            }
            Err(e) if is_unique_violation(&e, index) => {
                Err(AppError::AlreadyExists(format!("{} '{}' already exists", label, name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_named<T>(&self, table: &str, id: i64) -> AppResult<Option<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", table);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row)
    }
}
