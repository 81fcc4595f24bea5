mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{customer, organizer, test_config, venue_with_event, FailingCacheBackend, RecordingNotifier};
use seat_booking::cache::availability::availability_key;
use seat_booking::cache::events::EVENTS_LIST_KEY;
use seat_booking::cache::{CacheBackend, CacheError, CacheStatus, MemoryCacheBackend};
use seat_booking::error::AppError;
use seat_booking::models::{EventType, NewBooking, NewEvent};
use seat_booking::store::{InventoryStore, MemoryInventoryStore};
use seat_booking::AppState;

#[tokio::test]
async fn warm_availability_is_invalidated_by_booking() {
    let app = common::app();
    let state = &app.state;
    let (_, event, seats) = venue_with_event(state, 2, 5).await;

    let first = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(first.status, CacheStatus::Miss);
    let second = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(second.status, CacheStatus::Hit);
    assert!(app.cache.contains(&availability_key(event.id)));

    state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[3].id])
        .await
        .unwrap();
    assert!(!app.cache.contains(&availability_key(event.id)));

    let fresh = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(fresh.status, CacheStatus::Miss);
    assert_eq!(fresh.value.available_seats, 9);
    assert_eq!(fresh.value.booked[0].id, seats[3].id);
}

#[tokio::test]
async fn conflict_behind_stale_snapshot_drops_it() {
    let app = common::app();
    let state = &app.state;
    let (_, event, seats) = venue_with_event(state, 1, 3).await;

    let warm = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(warm.value.available_seats, 3);

    // Запись в обход движка: кеш о ней не знает
    app.store
        .insert_booking(&NewBooking {
            user_id: 99,
            event_id: event.id,
            venue_id: event.venue_id,
            seat_ids: vec![seats[1].id],
            price: 150.0,
        })
        .await
        .unwrap();
    assert!(app.cache.contains(&availability_key(event.id)));

    let err = state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[1].id])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(!app.cache.contains(&availability_key(event.id)));

    let fresh = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(fresh.status, CacheStatus::Miss);
    assert_eq!(fresh.value.booked_seats, 1);
    assert_eq!(fresh.value.booked[0].id, seats[1].id);
}

#[tokio::test]
async fn reads_without_writes_are_identical() {
    let app = common::app();
    let state = &app.state;
    let (_, event, seats) = venue_with_event(state, 3, 3).await;
    state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[0].id, seats[8].id])
        .await
        .unwrap();

    let a = state.availability.get_event_availability(event.id).await.unwrap();
    let b = state.availability.get_event_availability(event.id).await.unwrap();
    let direct = state.availability.compute(event.id).await.unwrap();

    assert_eq!(a.value, b.value);
    assert_eq!(b.value, direct);
    assert_eq!(direct.available_seats + direct.booked_seats, direct.total_seats);
}

#[tokio::test]
async fn booking_leaves_events_list_alone() {
    let app = common::app();
    let state = &app.state;
    let (_, event, seats) = venue_with_event(state, 1, 4).await;
    let page_size = state.config.cache.events_page_size;

    assert_eq!(state.events.list_upcoming_events(0, page_size).await.unwrap().status, CacheStatus::Miss);
    assert!(app.cache.contains(EVENTS_LIST_KEY));

    state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[0].id])
        .await
        .unwrap();
    assert!(app.cache.contains(EVENTS_LIST_KEY));
    assert_eq!(state.events.list_upcoming_events(0, page_size).await.unwrap().status, CacheStatus::Hit);
}

#[tokio::test]
async fn new_event_invalidates_events_list() {
    let app = common::app();
    let state = &app.state;
    let (venue, _, _) = venue_with_event(state, 1, 1).await;
    let page_size = state.config.cache.events_page_size;

    let before = state.events.list_upcoming_events(0, page_size).await.unwrap();
    assert_eq!(before.value.len(), 1);

    state
        .events
        .create_event(
            &organizer(),
            NewEvent {
                name: "Encore".to_string(),
                description: None,
                event_time: chrono::Utc::now() + chrono::Duration::days(2),
                event_type: EventType::Concert,
                venue_id: venue.id,
            },
        )
        .await
        .unwrap();
    assert!(!app.cache.contains(EVENTS_LIST_KEY));

    let after = state.events.list_upcoming_events(0, page_size).await.unwrap();
    assert_eq!(after.status, CacheStatus::Miss);
    assert_eq!(after.value.len(), 2);
}

#[tokio::test]
async fn later_pages_are_not_cached() {
    let app = common::app();
    let state = &app.state;
    venue_with_event(state, 1, 1).await;

    let page = state.events.list_upcoming_events(1, 10).await.unwrap();
    assert_eq!(page.status, CacheStatus::Bypass);
    assert!(page.value.is_empty());
    assert!(!app.cache.contains(EVENTS_LIST_KEY));
}

#[tokio::test]
async fn broken_cache_never_blocks_reads_or_bookings() {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        test_config(),
        Arc::new(MemoryInventoryStore::new()),
        Arc::new(FailingCacheBackend),
        notifier.clone(),
    );
    let (_, event, seats) = venue_with_event(&state, 2, 2).await;

    let before = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(before.status, CacheStatus::Bypass);
    assert_eq!(before.value.available_seats, 4);

    state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[0].id, seats[1].id])
        .await
        .unwrap();

    let after = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(after.status, CacheStatus::Bypass);
    assert_eq!(after.value.booked_seats, 2);

    state.notifications.shutdown().await;
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failing_notifier_does_not_fail_booking() {
    let state = AppState::from_parts(
        test_config(),
        Arc::new(MemoryInventoryStore::new()),
        Arc::new(seat_booking::cache::MemoryCacheBackend::new()),
        Arc::new(common::FailingNotifier),
    );
    let (_, event, seats) = venue_with_event(&state, 1, 1).await;

    let booking = state
        .bookings
        .create_booking(&customer(7), event.id, &[seats[0].id])
        .await
        .unwrap();
    assert_eq!(booking.tickets.len(), 1);
    state.notifications.shutdown().await;
}

/// Первый `get` падает, второй зависает, дальше обычный кеш в памяти.
#[derive(Default)]
struct StallingBackend {
    gets: AtomicUsize,
    inner: MemoryCacheBackend,
}

#[async_trait]
impl CacheBackend for StallingBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.gets.fetch_add(1, Ordering::SeqCst) {
            0 => Err(CacheError::Backend("connection reset".to_string())),
            1 => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(None)
            }
            _ => self.inner.get(key).await,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.inner.del(key).await
    }
}

#[tokio::test]
async fn dropped_half_open_read_does_not_wedge_cache() {
    let mut config = test_config();
    config.circuit_breaker.failure_threshold = 1;
    config.circuit_breaker.timeout_seconds = 0;
    let backend = Arc::new(StallingBackend::default());
    let state = AppState::from_parts(
        config,
        Arc::new(MemoryInventoryStore::new()),
        backend.clone(),
        Arc::new(RecordingNotifier::default()),
    );
    let (_, event, _) = venue_with_event(&state, 2, 2).await;

    let failed = state.availability.get_event_availability(event.id).await.unwrap();
    assert_eq!(failed.status, CacheStatus::Bypass);

    // Клиент отключился, пока пробный запрос висел в бэкенде
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        state.availability.get_event_availability(event.id),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(state.availability.get_event_availability(event.id).await.unwrap().status);
    }
    assert_eq!(statuses[0], CacheStatus::Miss);
    assert!(statuses[1..].iter().all(|s| *s == CacheStatus::Hit));
    assert!(backend.gets.load(Ordering::SeqCst) > 2);
}
