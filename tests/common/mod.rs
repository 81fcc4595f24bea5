//! Общая обвязка интеграционных тестов: состояние приложения на хранилище
//! и кеше в памяти, записывающий нотификатор и сломанный бэкенд кеша.

#![allow(dead_code)]

use async_trait::async_trait;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seat_booking::cache::{CacheBackend, CacheError, MemoryCacheBackend};
use seat_booking::config::Config;
use seat_booking::middleware::Claims;
use seat_booking::models::{Actor, Event, EventType, NewEvent, Seat, UserRole, Venue};
use seat_booking::services::notification::{BookingConfirmed, Notifier, NotifyError};
use seat_booking::store::MemoryInventoryStore;
use seat_booking::AppState;

pub const JWT_SECRET: &str = "integration-secret";

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<BookingConfirmed>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, message: &BookingConfirmed) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Нотификатор, у которого любая доставка заканчивается ошибкой.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn booking_confirmed(&self, _message: &BookingConfirmed) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected(reqwest::StatusCode::BAD_GATEWAY))
    }
}

/// Бэкенд кеша, который всегда отвечает ошибкой (как упавший Redis).
pub struct FailingCacheBackend;

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: MemoryInventoryStore,
    pub cache: MemoryCacheBackend,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = JWT_SECRET.to_string();
    config
}

pub fn app_with(config: Config) -> TestApp {
    let store = MemoryInventoryStore::new();
    let cache = MemoryCacheBackend::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        config,
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        notifier.clone(),
    );
    TestApp {
        state: Arc::new(state),
        store,
        cache,
        notifier,
    }
}

pub fn app() -> TestApp {
    app_with(test_config())
}

pub fn organizer() -> Actor {
    Actor::new(1, "organizer@example.com", UserRole::Organizer)
}

pub fn customer(user_id: i64) -> Actor {
    Actor::new(user_id, format!("customer{}@example.com", user_id), UserRole::Customer)
}

pub fn venue_name() -> String {
    let company: String = CompanyName().fake();
    format!("{} Hall {}", company, (1000..9999).fake::<u32>())
}

/// Площадка `rows × cols`, событие на ней через сутки и места в порядке создания.
pub async fn venue_with_event(state: &AppState, rows: i32, cols: i32) -> (Venue, Event, Vec<Seat>) {
    let venue = state
        .venues
        .create_venue(&organizer(), &venue_name(), rows, cols)
        .await
        .unwrap();
    let event = state
        .events
        .create_event(
            &organizer(),
            NewEvent {
                name: "Premiere".to_string(),
                description: Some("Opening night".to_string()),
                event_time: chrono::Utc::now() + chrono::Duration::days(1),
                event_type: EventType::Movie,
                venue_id: venue.id,
            },
        )
        .await
        .unwrap();
    let seats = state.venues.venue_seats(venue.id).await.unwrap();
    (venue, event, seats)
}

pub fn bearer(actor: &Actor) -> String {
    let claims = Claims {
        sub: actor.user_id.to_string(),
        email: actor.email.clone(),
        role: actor.role,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
