//! Бронирование мест.
//!
//! Конкурентные брони ничем не синхронизируются в процессе. Арбитр один:
//! уникальный индекс `(event_id, seat_id)` в таблице билетов. Бронь со всеми
//! билетами пишется одной транзакцией, и нарушение индекса откатывает её
//! целиком, а наружу уходит `Conflict`. Предварительная проверка по снимку
//! доступности только экономит заведомо проигрышные транзакции.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::CacheService;
use crate::config::BookingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Actor, Booking, Event, NewBooking, UserRole};
use crate::services::availability::AvailabilityService;
use crate::services::notification::{BookingConfirmed, NotificationDispatcher};
use crate::store::InventoryStore;

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn InventoryStore>,
    availability: AvailabilityService,
    cache: CacheService,
    notifications: Arc<NotificationDispatcher>,
    config: BookingConfig,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        availability: AvailabilityService,
        cache: CacheService,
        notifications: Arc<NotificationDispatcher>,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            availability,
            cache,
            notifications,
            config,
        }
    }

    /// Пустой список, повторы и слишком большие брони отклоняются сразу.
    fn normalize_seat_ids(&self, seat_ids: &[i64]) -> AppResult<Vec<i64>> {
        if seat_ids.is_empty() {
            return Err(AppError::Validation("seat_ids must not be empty".to_string()));
        }
        if seat_ids.len() > self.config.max_seats_per_booking {
            return Err(AppError::Validation(format!(
                "At most {} seats can be booked at once",
                self.config.max_seats_per_booking
            )));
        }

        let mut seen = HashSet::with_capacity(seat_ids.len());
        for id in seat_ids {
            if !seen.insert(*id) {
                return Err(AppError::Validation(format!("Seat {} is listed twice", id)));
            }
        }
        Ok(seat_ids.to_vec())
    }

    /// Оптимистичная проверка по снимку (обычно из кеша). Билеты не удаляются,
    /// поэтому устаревший снимок может только недосчитать занятые места,
    /// а их всё равно поймает индекс при записи.
    async fn precheck(&self, event: &Event, seat_ids: &[i64]) -> AppResult<()> {
        let snapshot = self.availability.get_event_availability(event.id).await?.value;

        let known: HashSet<i64> = snapshot
            .available
            .iter()
            .chain(snapshot.booked.iter())
            .map(|s| s.id)
            .collect();
        let foreign: Vec<i64> = seat_ids.iter().copied().filter(|id| !known.contains(id)).collect();
        if !foreign.is_empty() {
            return Err(AppError::Validation(format!(
                "Seats {:?} do not belong to the event's venue",
                foreign
            )));
        }

        if snapshot.booked.iter().any(|s| seat_ids.contains(&s.id)) {
            debug!("Precheck rejected booking for event {}", event.id);
            return Err(AppError::seats_taken());
        }
        Ok(())
    }

    pub async fn create_booking(&self, actor: &Actor, event_id: i64, seat_ids: &[i64]) -> AppResult<Booking> {
        actor.require(UserRole::Customer)?;
        let seat_ids = self.normalize_seat_ids(seat_ids)?;

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))?;

        if self.config.precheck {
            self.precheck(&event, &seat_ids).await?;
        }

        let request = NewBooking {
            user_id: actor.user_id,
            event_id: event.id,
            venue_id: event.venue_id,
            seat_ids,
            price: self.config.ticket_price,
        };

        let booking = match self.store.insert_booking(&request).await {
            Ok(booking) => booking,
            Err(e) => {
                let err = AppError::from(e);
                if matches!(err, AppError::Conflict(_)) {
                    info!(
                        "Booking conflict for user {} on event {}: seats {:?}",
                        actor.user_id, event.id, request.seat_ids
                    );
                    // Снимок пропустил занятые места, значит он устарел
                    self.cache.invalidate_availability(event.id).await;
                }
                return Err(err);
            }
        };

        info!(
            "Booking {} confirmed for user {}: {} tickets",
            booking.id,
            actor.user_id,
            booking.tickets.len()
        );

        join_all(
            booking
                .event_ids()
                .into_iter()
                .map(|touched| self.cache.invalidate_availability(touched)),
        )
        .await;

        self.notifications.dispatch(BookingConfirmed {
            booking_id: booking.id,
            user_email: actor.email.clone(),
        });

        Ok(booking)
    }

    /// Бронь видна только владельцу. Чужая выглядит так же, как несуществующая.
    pub async fn get_booking(&self, actor: &Actor, booking_id: i64) -> AppResult<Booking> {
        match self.store.get_booking(booking_id).await? {
            Some(booking) if booking.user_id == actor.user_id => Ok(booking),
            _ => Err(AppError::NotFound(format!("Booking {} not found", booking_id))),
        }
    }

    pub async fn list_bookings(&self, actor: &Actor) -> AppResult<Vec<Booking>> {
        Ok(self.store.bookings_for_user(actor.user_id).await?)
    }
}
