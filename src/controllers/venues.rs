use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::PageQuery;
use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues).post(create_venue))
        .route("/venues/{id}", get(get_venue))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVenueRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub rows: i32,
    #[validate(range(min = 1))]
    pub cols: i32,
}

pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateVenueRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let venue = state
        .venues
        .create_venue(&actor, &body.name, body.rows, body.cols)
        .await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

pub async fn list_venues(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (offset, limit) = page.resolve(20);
    Ok(Json(state.venues.list_venues(offset, limit).await?))
}

pub async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.venues.get_venue(id).await?))
}
