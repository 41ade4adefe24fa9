use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{NewMovieSchedule, NewShowtime};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes", post(add_showtime))
        .route("/showtimes/{id}", get(get_showtime).delete(delete_showtime))
        .route("/movies/{id}", get(get_movie))
        .route("/movies/{id}/showtimes", get(list_showtimes))
        .route("/schedules", post(add_schedule))
        .route("/schedules/{id}", delete(delete_schedule))
}

// POST /api/showtimes
async fn add_showtime(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<NewShowtime>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let showtime = state.schedules.add_showtime(user.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(showtime)))
}

// GET /api/showtimes/{id}
async fn get_showtime(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.schedules.showtime(id).await?))
}

// DELETE /api/showtimes/{id}
async fn delete_showtime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    state.schedules.delete_showtime(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/movies/{id}
async fn get_movie(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.schedules.movie(id).await?))
}

// GET /api/movies/{id}/showtimes
async fn list_showtimes(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.schedules.list_showtimes_by_movie(id).await?))
}

// POST /api/schedules
async fn add_schedule(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<NewMovieSchedule>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let schedule = state.schedules.add_movie_schedule(user.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

// DELETE /api/schedules/{id}
async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    state.schedules.delete_movie_schedule(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
