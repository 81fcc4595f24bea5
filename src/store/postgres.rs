use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::{InventoryStore, StoreError, StoreResult};
use crate::database::Database;
use crate::models::{
    Booking, BookingStatus, Event, NewBooking, NewEvent, NewSeat, Seat, SeatView, Ticket, Venue,
};

const VENUE_COLUMNS: &str = "id, name, row_count AS rows, col_count AS cols";
const EVENT_COLUMNS: &str =
    "id, name, description, event_time, event_type, venue_id, organizer_id";

#[derive(Clone)]
pub struct PgInventoryStore {
    db: Database,
}

#[derive(FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    booking_time: DateTime<Utc>,
    status: BookingStatus,
}

#[derive(FromRow)]
struct TicketRow {
    id: i64,
    booking_id: i64,
    price: f64,
    event_id: i64,
    seat_id: i64,
    row: String,
    number: i32,
}

impl TicketRow {
    fn into_ticket(self) -> Ticket {
        Ticket {
            id: self.id,
            price: self.price,
            event_id: self.event_id,
            seat: SeatView {
                id: self.seat_id,
                row: self.row,
                number: self.number,
            },
        }
    }
}

impl BookingRow {
    fn with_tickets(self, tickets: Vec<Ticket>) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            booking_time: self.booking_time,
            status: self.status,
            tickets,
        }
    }
}

impl PgInventoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn tickets_for(&self, booking_ids: &[i64]) -> StoreResult<Vec<TicketRow>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT t.id, t.booking_id, t.price::FLOAT8 AS price, t.event_id,
                   s.id AS seat_id, s.row_label AS row, s.number
            FROM tickets t
            JOIN seats s ON s.id = t.seat_id
            WHERE t.booking_id = ANY($1)
            ORDER BY t.booking_id, t.id
            "#,
        )
        .bind(booking_ids)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn create_venue(
        &self,
        name: &str,
        rows: i32,
        cols: i32,
        seats: Vec<NewSeat>,
    ) -> StoreResult<Venue> {
        let mut tx = self.db.pool.begin().await?;

        let venue = sqlx::query_as::<_, Venue>(&format!(
            "INSERT INTO venues (name, row_count, col_count) VALUES ($1, $2, $3) RETURNING {}",
            VENUE_COLUMNS
        ))
        .bind(name)
        .bind(rows)
        .bind(cols)
        .fetch_one(&mut *tx)
        .await?;

        // Вся сетка мест одним запросом, в той же транзакции что и площадка
        let (labels, numbers): (Vec<String>, Vec<i32>) =
            seats.into_iter().map(|s| (s.row, s.number)).unzip();

        let inserted = sqlx::query(
            r#"
            INSERT INTO seats (venue_id, row_label, number)
            SELECT $1, r.label, r.number
            FROM UNNEST($2::TEXT[], $3::INT4[]) WITH ORDINALITY AS r(label, number, ord)
            ORDER BY r.ord
            "#,
        )
        .bind(venue.id)
        .bind(&labels)
        .bind(&numbers)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted as usize != labels.len() {
            let _ = tx.rollback().await;
            return Err(StoreError::Backend(format!(
                "venue {}: inserted {} of {} seats",
                name,
                inserted,
                labels.len()
            )));
        }

        tx.commit().await?;
        debug!("Venue {} created with {} seats", venue.id, inserted);
        Ok(venue)
    }

    async fn get_venue(&self, venue_id: i64) -> StoreResult<Option<Venue>> {
        let venue = sqlx::query_as::<_, Venue>(&format!(
            "SELECT {} FROM venues WHERE id = $1",
            VENUE_COLUMNS
        ))
        .bind(venue_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(venue)
    }

    async fn list_venues(&self, offset: i64, limit: i64) -> StoreResult<Vec<Venue>> {
        let venues = sqlx::query_as::<_, Venue>(&format!(
            "SELECT {} FROM venues ORDER BY id LIMIT $1 OFFSET $2",
            VENUE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(venues)
    }

    async fn venue_seats(&self, venue_id: i64) -> StoreResult<Vec<Seat>> {
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT id, venue_id, row_label AS row, number FROM seats WHERE venue_id = $1 ORDER BY id",
        )
        .bind(venue_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    async fn create_event(&self, organizer_id: i64, event: &NewEvent) -> StoreResult<Event> {
        let created = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (name, description, event_time, event_type, venue_id, organizer_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.event_time)
        .bind(event.event_type)
        .bind(event.venue_id)
        .bind(organizer_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn get_event(&self, event_id: i64) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(event)
    }

    async fn list_upcoming_events(
        &self,
        from: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events
             WHERE event_time >= $1
             ORDER BY event_time, id
             LIMIT $2 OFFSET $3",
            EVENT_COLUMNS
        ))
        .bind(from)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn booked_seat_ids(&self, event_id: i64) -> StoreResult<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT seat_id FROM tickets WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking> {
        let mut tx = self.db.pool.begin().await?;

        // 1) Сама бронь
        let head = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings (user_id, status) VALUES ($1, $2)
             RETURNING id, user_id, booking_time, status",
        )
        .bind(booking.user_id)
        .bind(BookingStatus::Confirmed)
        .fetch_one(&mut *tx)
        .await;

        let head = match head {
            Ok(head) => head,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e.into());
            }
        };

        // 2) Билеты одним INSERT. Места чужой площадки отсекаются JOIN'ом,
        //    повторное место упирается в tickets_event_seat_key
        let tickets = sqlx::query_as::<_, TicketRow>(
            r#"
            WITH inserted AS (
                INSERT INTO tickets (price, booking_id, event_id, seat_id)
                SELECT $1::FLOAT8::NUMERIC(10, 2), $2, $3, s.id
                FROM UNNEST($4::INT8[]) WITH ORDINALITY AS req(seat_id, ord)
                JOIN seats s ON s.id = req.seat_id AND s.venue_id = $5
                ORDER BY req.ord
                RETURNING id, booking_id, price, event_id, seat_id
            )
            SELECT i.id, i.booking_id, i.price::FLOAT8 AS price, i.event_id,
                   s.id AS seat_id, s.row_label AS row, s.number
            FROM inserted i
            JOIN seats s ON s.id = i.seat_id
            ORDER BY i.id
            "#,
        )
        .bind(booking.price)
        .bind(head.id)
        .bind(booking.event_id)
        .bind(&booking.seat_ids)
        .bind(booking.venue_id)
        .fetch_all(&mut *tx)
        .await;

        let tickets = match tickets {
            Ok(rows) => rows,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e.into());
            }
        };

        if tickets.len() != booking.seat_ids.len() {
            let _ = tx.rollback().await;
            let inserted: HashSet<i64> = tickets.iter().map(|t| t.seat_id).collect();
            let foreign: Vec<i64> = booking
                .seat_ids
                .iter()
                .copied()
                .filter(|id| !inserted.contains(id))
                .collect();
            warn!(
                "Booking for event {} rejected: seats {:?} are outside venue {}",
                booking.event_id, foreign, booking.venue_id
            );
            return Err(StoreError::ForeignSeats(foreign));
        }

        // 3) Коммит
        tx.commit().await?;

        Ok(head.with_tickets(tickets.into_iter().map(TicketRow::into_ticket).collect()))
    }

    async fn get_booking(&self, booking_id: i64) -> StoreResult<Option<Booking>> {
        let head = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, booking_time, status FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(head) = head else {
            return Ok(None);
        };

        let tickets = self.tickets_for(&[head.id]).await?;
        Ok(Some(head.with_tickets(
            tickets.into_iter().map(TicketRow::into_ticket).collect(),
        )))
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let heads = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, booking_time, status FROM bookings
             WHERE user_id = $1
             ORDER BY booking_time DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let ids: Vec<i64> = heads.iter().map(|h| h.id).collect();
        let mut grouped: BTreeMap<i64, Vec<Ticket>> = BTreeMap::new();
        for row in self.tickets_for(&ids).await? {
            grouped.entry(row.booking_id).or_default().push(row.into_ticket());
        }

        Ok(heads
            .into_iter()
            .map(|head| {
                let tickets = grouped.remove(&head.id).unwrap_or_default();
                head.with_tickets(tickets)
            })
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(())
    }
}
