use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::PageQuery;
use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{EventType, NewEvent};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/availability", get(get_availability))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub event_time: DateTime<Utc>,
    pub event_type: EventType,
    pub venue_id: i64,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        NewEvent {
            name: req.name.trim().to_string(),
            description: req.description,
            event_time: req.event_time,
            event_type: req.event_type,
            venue_id: req.venue_id,
        }
    }
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let event = state.events.create_event(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let page_size = state.config.cache.events_page_size;
    let (offset, limit) = page.resolve(page_size);
    let page = state.events.list_upcoming_events(offset, limit).await?;

    Ok(([("x-cache", page.status.as_str())], Json(page.value)))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.events.get_event(id).await?))
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.availability.get_event_availability(id).await?;
    Ok(([("x-cache", snapshot.status.as_str())], Json(snapshot.value)))
}
