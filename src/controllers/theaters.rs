use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{CreateSeatsRequest, NewTheater, NewTheaterScreen, TheaterScreenUpdate, TheaterUpdate};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/theaters", post(add_theater))
        .route("/theaters/{id}", patch(update_theater).delete(delete_theater))
        .route("/theaters/{id}/screens", post(add_screen))
        .route("/theaters/{id}/schedules", get(list_schedules))
        .route("/screens/{id}", patch(update_screen).delete(delete_screen))
        .route("/screens/{id}/seats", post(create_seats).get(list_seats))
        .route("/seats/{id}", delete(delete_seat))
}

/* ---------- theaters ---------- */

// POST /api/theaters
async fn add_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<NewTheater>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let theater = state.registry.add_theater(user.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(theater)))
}

// PATCH /api/theaters/{id}
async fn update_theater(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
    Json(req): Json<TheaterUpdate>,
) -> AppResult<impl IntoResponse> {
    let theater = state.registry.update_theater(user.user_id, id, &req).await?;
    Ok(Json(theater))
}

// DELETE /api/theaters/{id}
async fn delete_theater(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    state.registry.delete_theater(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/theaters/{id}/schedules
async fn list_schedules(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.schedules.list_schedules_by_theater(id).await?))
}

/* ---------- screens ---------- */

// POST /api/theaters/{id}/screens
async fn add_screen(
    State(state): State<Arc<AppState>>,
    Path(theater_id): Path<i64>,
    user: AuthUser,
    Json(req): Json<NewTheaterScreen>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let screen = state.registry.add_theater_screen(user.user_id, theater_id, &req).await?;
    Ok((StatusCode::CREATED, Json(screen)))
}

// PATCH /api/screens/{id}
async fn update_screen(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
    Json(req): Json<TheaterScreenUpdate>,
) -> AppResult<impl IntoResponse> {
    let screen = state.registry.update_theater_screen(user.user_id, id, &req).await?;
    Ok(Json(screen))
}

// DELETE /api/screens/{id}
async fn delete_screen(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    state.registry.delete_theater_screen(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/* ---------- seats ---------- */

// POST /api/screens/{id}/seats
async fn create_seats(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<i64>,
    user: AuthUser,
    Json(req): Json<CreateSeatsRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let seats = state.registry.create_seats(user.user_id, screen_id, &req).await?;
    Ok((StatusCode::CREATED, Json(seats)))
}

// GET /api/screens/{id}/seats
async fn list_seats(State(state): State<Arc<AppState>>, Path(screen_id): Path<i64>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.registry.list_seats(screen_id).await?))
}

// DELETE /api/seats/{id}
async fn delete_seat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    state.registry.delete_seat(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
