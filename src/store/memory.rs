//! Хранилище в памяти процесса. Используется в режиме разработки (без
//! `DATABASE_URL`) и в тестах. Таблицы лежат под одним мьютексом, поэтому
//! запись брони со всеми билетами атомарна так же, как транзакция в Postgres,
//! а индекс `(event_id, seat_id)` ведет себя как уникальное ограничение.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{InventoryStore, StoreError, StoreResult, TICKET_EVENT_SEAT_UNIQUE, VENUE_NAME_UNIQUE};
use crate::models::{
    Booking, BookingStatus, Event, NewBooking, NewEvent, NewSeat, Seat, SeatView, Ticket, Venue,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    venues: BTreeMap<i64, Venue>,
    seats: BTreeMap<i64, Seat>,
    seats_by_venue: HashMap<i64, Vec<i64>>,
    events: BTreeMap<i64, Event>,
    bookings: BTreeMap<i64, Booking>,
    // event_id -> seat_id -> ticket_id
    ticket_index: HashMap<i64, HashMap<i64, i64>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryInventoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("inventory tables lock poisoned".to_string()))
    }

    pub fn booking_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.bookings.len())
    }

    pub fn ticket_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.ticket_index.values().map(HashMap::len).sum())
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn create_venue(
        &self,
        name: &str,
        rows: i32,
        cols: i32,
        seats: Vec<NewSeat>,
    ) -> StoreResult<Venue> {
        let mut tables = self.lock()?;

        if tables.venues.values().any(|v| v.name == name) {
            return Err(StoreError::UniqueViolation(VENUE_NAME_UNIQUE.to_string()));
        }

        {
            let mut seen = HashSet::new();
            for seat in &seats {
                if !seen.insert((seat.row.as_str(), seat.number)) {
                    return Err(StoreError::UniqueViolation(
                        "seats_venue_row_number_key".to_string(),
                    ));
                }
            }
        }

        let venue = Venue {
            id: tables.next_id(),
            name: name.to_string(),
            rows,
            cols,
        };

        let mut seat_ids = Vec::with_capacity(seats.len());
        for seat in seats {
            let id = tables.next_id();
            tables.seats.insert(
                id,
                Seat {
                    id,
                    venue_id: venue.id,
                    row: seat.row,
                    number: seat.number,
                },
            );
            seat_ids.push(id);
        }

        tables.seats_by_venue.insert(venue.id, seat_ids);
        tables.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn get_venue(&self, venue_id: i64) -> StoreResult<Option<Venue>> {
        Ok(self.lock()?.venues.get(&venue_id).cloned())
    }

    async fn list_venues(&self, offset: i64, limit: i64) -> StoreResult<Vec<Venue>> {
        Ok(self
            .lock()?
            .venues
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn venue_seats(&self, venue_id: i64) -> StoreResult<Vec<Seat>> {
        let tables = self.lock()?;
        let ids = match tables.seats_by_venue.get(&venue_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| tables.seats.get(id).cloned())
            .collect())
    }

    async fn create_event(&self, organizer_id: i64, event: &NewEvent) -> StoreResult<Event> {
        let mut tables = self.lock()?;

        if !tables.venues.contains_key(&event.venue_id) {
            return Err(StoreError::MissingReference(format!(
                "Venue {} not found",
                event.venue_id
            )));
        }

        let created = Event {
            id: tables.next_id(),
            name: event.name.clone(),
            description: event.description.clone(),
            event_time: event.event_time,
            event_type: event.event_type,
            venue_id: event.venue_id,
            organizer_id,
        };
        tables.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_event(&self, event_id: i64) -> StoreResult<Option<Event>> {
        Ok(self.lock()?.events.get(&event_id).cloned())
    }

    async fn list_upcoming_events(
        &self,
        from: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Event>> {
        let tables = self.lock()?;
        let mut upcoming: Vec<&Event> = tables
            .events
            .values()
            .filter(|e| e.event_time >= from)
            .collect();
        upcoming.sort_by(|a, b| a.event_time.cmp(&b.event_time).then(a.id.cmp(&b.id)));

        Ok(upcoming
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn booked_seat_ids(&self, event_id: i64) -> StoreResult<HashSet<i64>> {
        Ok(self
            .lock()?
            .ticket_index
            .get(&event_id)
            .map(|sold| sold.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking> {
        let mut tables = self.lock()?;

        if !tables.events.contains_key(&booking.event_id) {
            return Err(StoreError::MissingReference(format!(
                "Event {} not found",
                booking.event_id
            )));
        }

        // Всё проверяем до первой записи: так откат не нужен вовсе
        let foreign: Vec<i64> = booking
            .seat_ids
            .iter()
            .copied()
            .filter(|id| {
                tables
                    .seats
                    .get(id)
                    .map_or(true, |seat| seat.venue_id != booking.venue_id)
            })
            .collect();
        if !foreign.is_empty() {
            return Err(StoreError::ForeignSeats(foreign));
        }

        let sold = tables.ticket_index.get(&booking.event_id);
        let mut claimed = HashSet::new();
        for seat_id in &booking.seat_ids {
            let taken = sold.is_some_and(|sold| sold.contains_key(seat_id));
            if taken || !claimed.insert(*seat_id) {
                return Err(StoreError::UniqueViolation(
                    TICKET_EVENT_SEAT_UNIQUE.to_string(),
                ));
            }
        }

        let booking_id = tables.next_id();
        let mut tickets = Vec::with_capacity(booking.seat_ids.len());
        for seat_id in &booking.seat_ids {
            let ticket_id = tables.next_id();
            let seat = tables
                .seats
                .get(seat_id)
                .map(SeatView::from)
                .ok_or_else(|| StoreError::Backend(format!("seat {} vanished", seat_id)))?;
            tables
                .ticket_index
                .entry(booking.event_id)
                .or_default()
                .insert(*seat_id, ticket_id);
            tickets.push(Ticket {
                id: ticket_id,
                price: booking.price,
                event_id: booking.event_id,
                seat,
            });
        }

        let created = Booking {
            id: booking_id,
            user_id: booking.user_id,
            booking_time: Utc::now(),
            status: BookingStatus::Confirmed,
            tickets,
        };
        tables.bookings.insert(booking_id, created.clone());
        Ok(created)
    }

    async fn get_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}
