use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub event_id: i64,
    #[validate(length(min = 1))]
    pub seat_ids: Vec<i64>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let booking = state
        .bookings
        .create_booking(&actor, body.event_id, &body.seat_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.bookings.list_bookings(&actor).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.bookings.get_booking(&actor, id).await?))
}
