use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::NewMovie;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", post(add_movie))
        .route("/theater-types", post(add_theater_type))
        .route("/screen-types", post(add_screen_type))
        .route("/seat-categories", post(add_seat_category))
}

#[derive(Debug, Deserialize, Validate)]
struct NameRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
}

// POST /api/movies
async fn add_movie(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<NewMovie>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let movie = state.catalog.add_movie(&req).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

// POST /api/theater-types
async fn add_theater_type(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<NameRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.add_theater_type(&req.name).await?)))
}

// POST /api/screen-types
async fn add_screen_type(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<NameRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.add_screen_type(&req.name).await?)))
}

// POST /api/seat-categories
async fn add_seat_category(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<NameRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.add_seat_category(&req.name).await?)))
}
