use serde::{Deserialize, Serialize};

use super::SeatView;

/// Снимок доступности мест события. Вычисляется, в БД не хранится.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub event_id: i64,
    pub total_seats: usize,
    pub available_seats: usize,
    pub booked_seats: usize,
    pub available: Vec<SeatView>,
    pub booked: Vec<SeatView>,
}

