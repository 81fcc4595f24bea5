use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SeatView;

/// Статус брони. Бронь сразу создается в `Confirmed`:
/// `Pending` и `Cancelled` зарезервированы, переходов в них нет.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub price: f64,
    pub event_id: i64,
    pub seat: SeatView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub booking_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub tickets: Vec<Ticket>,
}

impl Booking {
    /// События, которых касается бронь (без повторов, в порядке билетов).
    pub fn event_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for ticket in &self.tickets {
            if !ids.contains(&ticket.event_id) {
                ids.push(ticket.event_id);
            }
        }
        ids
    }
}

/// Всё, что нужно хранилищу, чтобы одной транзакцией записать бронь и её билеты.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub event_id: i64,
    pub venue_id: i64,
    pub seat_ids: Vec<i64>,
    pub price: f64,
}
