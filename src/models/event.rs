use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_type", rename_all = "lowercase")]
pub enum EventType {
    Movie,
    Concert,
    Meetup,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub event_time: DateTime<Utc>,
    pub event_type: EventType,
    pub venue_id: i64,
    pub organizer_id: i64,
}

/// Поля нового события. Организатор берется из аутентифицированного пользователя.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub event_time: DateTime<Utc>,
    pub event_type: EventType,
    pub venue_id: i64,
}
