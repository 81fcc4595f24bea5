use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub venue_id: i64,
    pub row: String,
    pub number: i32,
}

/// Место в том виде, в котором оно уходит клиенту и в кеш: только id, ряд и номер.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SeatView {
    pub id: i64,
    pub row: String,
    pub number: i32,
}

impl From<&Seat> for SeatView {
    fn from(seat: &Seat) -> Self {
        Self {
            id: seat.id,
            row: seat.row.clone(),
            number: seat.number,
        }
    }
}

/// Место, которое еще только предстоит записать (без id и площадки).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeat {
    pub row: String,
    pub number: i32,
}
