use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheService, Cached};
use crate::error::{AppError, AppResult};
use crate::models::{Availability, Seat, SeatView};
use crate::store::InventoryStore;

/// Делит места площадки на свободные и занятые. Чистая функция: одни и те же
/// места и билеты всегда дают одно и то же разбиение, на этом держится кеш.
pub fn partition(event_id: i64, seats: &[Seat], booked_ids: &HashSet<i64>) -> Availability {
    let mut available = Vec::with_capacity(seats.len().saturating_sub(booked_ids.len()));
    let mut booked = Vec::with_capacity(booked_ids.len());

    for seat in seats {
        if booked_ids.contains(&seat.id) {
            booked.push(SeatView::from(seat));
        } else {
            available.push(SeatView::from(seat));
        }
    }

    Availability {
        event_id,
        total_seats: seats.len(),
        available_seats: available.len(),
        booked_seats: booked.len(),
        available,
        booked,
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn InventoryStore>,
    cache: CacheService,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: CacheService) -> Self {
        Self { store, cache }
    }

    /// Прямой расчет из хранилища, мимо кеша.
    pub async fn compute(&self, event_id: i64) -> AppResult<Availability> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))?;

        let seats = self.store.venue_seats(event.venue_id).await?;
        let booked_ids = self.store.booked_seat_ids(event.id).await?;
        debug!(
            "Availability computed for event {}: {} seats, {} booked",
            event.id,
            seats.len(),
            booked_ids.len()
        );

        Ok(partition(event.id, &seats, &booked_ids))
    }

    pub async fn get_event_availability(&self, event_id: i64) -> AppResult<Cached<Availability>> {
        self.cache
            .availability(event_id, || self.compute(event_id))
            .await
    }
}
