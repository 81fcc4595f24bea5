//! Хранилище инвентаря: площадки, места, события, брони и билеты.
//!
//! Единственный арбитр конкурентных бронирований - ограничение уникальности
//! `(event_id, seat_id)` в таблице билетов. Любая реализация [`InventoryStore`]
//! обязана записывать бронь и все её билеты атомарно и сообщать о нарушении
//! этого ограничения как [`StoreError::UniqueViolation`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::{Booking, Event, NewBooking, NewEvent, NewSeat, Seat, Venue};

pub mod memory;
pub mod postgres;

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

/// Имя ограничения уникальности билетов в схеме БД.
pub const TICKET_EVENT_SEAT_UNIQUE: &str = "tickets_event_seat_key";
pub const VENUE_NAME_UNIQUE: &str = "venues_name_key";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint {0} violated")]
    UniqueViolation(String),
    #[error("{0}")]
    MissingReference(String),
    #[error("seats {0:?} are not part of the venue")]
    ForeignSeats(Vec<i64>),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(format!(
                    "Referenced row does not exist ({})",
                    constraint
                ));
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Создает площадку и все её места одной транзакцией.
    async fn create_venue(
        &self,
        name: &str,
        rows: i32,
        cols: i32,
        seats: Vec<NewSeat>,
    ) -> StoreResult<Venue>;

    async fn get_venue(&self, venue_id: i64) -> StoreResult<Option<Venue>>;

    async fn list_venues(&self, offset: i64, limit: i64) -> StoreResult<Vec<Venue>>;

    /// Места площадки в порядке создания (ряд за рядом).
    async fn venue_seats(&self, venue_id: i64) -> StoreResult<Vec<Seat>>;

    async fn create_event(&self, organizer_id: i64, event: &NewEvent) -> StoreResult<Event>;

    async fn get_event(&self, event_id: i64) -> StoreResult<Option<Event>>;

    /// События начиная с `from`, по возрастанию времени начала.
    async fn list_upcoming_events(
        &self,
        from: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Event>>;

    async fn booked_seat_ids(&self, event_id: i64) -> StoreResult<HashSet<i64>>;

    /// Атомарно записывает бронь и по билету на каждое место.
    /// Либо записано всё, либо ничего.
    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking>;

    async fn get_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>>;

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>>;

    async fn health_check(&self) -> StoreResult<()>;
}
