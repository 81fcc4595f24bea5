pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod shutdown;
pub mod store;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{info, warn};

use cache::{CacheBackend, CacheService, MemoryCacheBackend, RedisCacheBackend};
use middleware::JwtVerifier;
use services::notification::{LogNotifier, WebhookNotifier};
use services::{AvailabilityService, BookingEngine, EventService, NotificationDispatcher, Notifier, VenueCatalog};
use store::{InventoryStore, MemoryInventoryStore, PgInventoryStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub cache: CacheService,
    pub venues: VenueCatalog,
    pub events: EventService,
    pub availability: AvailabilityService,
    pub bookings: BookingEngine,
    pub notifications: Arc<NotificationDispatcher>,
    pub jwt: JwtVerifier,
    pub config: config::Config,
    /// Пул Postgres, если работаем не на хранилище в памяти. Закрывается при остановке.
    pub database: Option<database::Database>,
}

impl AppState {
    /// Поднимает хранилище, кеш и уведомления по конфигурации. Без `DATABASE_URL`
    /// и `REDIS_URL` всё живет в памяти процесса.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let database = match &config.database.url {
            Some(url) => {
                let db = database::Database::connect(url, &config.database)
                    .await
                    .context("Failed to connect to database")?;
                info!("Database connected");
                db.run_migrations().await.context("Failed to run migrations")?;
                Some(db)
            }
            None => None,
        };

        let store: Arc<dyn InventoryStore> = match &database {
            Some(db) => Arc::new(PgInventoryStore::new(db.clone())),
            None => {
                warn!("DATABASE_URL is not set - using in-memory inventory store");
                Arc::new(MemoryInventoryStore::new())
            }
        };

        let cache_backend: Arc<dyn CacheBackend> = match &config.redis.url {
            Some(url) => {
                let redis = redis_client::RedisClient::new(url)
                    .await
                    .context("Failed to connect to Redis")?;
                info!("Redis connected");
                Arc::new(RedisCacheBackend::new(redis))
            }
            None => {
                warn!("REDIS_URL is not set - using in-memory cache");
                Arc::new(MemoryCacheBackend::new())
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.notification.webhook_url {
            Some(url) => Arc::new(
                WebhookNotifier::new(url.clone(), Duration::from_secs(config.notification.timeout_secs))
                    .context("Failed to build webhook client")?,
            ),
            None => Arc::new(LogNotifier),
        };

        let mut state = Self::from_parts(config, store, cache_backend, notifier);
        state.database = database;
        let state = Arc::new(state);

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.events.warmup_cache().await;
        });

        Ok(state)
    }

    /// Сборка состояния из готовых компонентов. Используется в `new` и в тестах.
    pub fn from_parts(
        config: config::Config,
        store: Arc<dyn InventoryStore>,
        cache_backend: Arc<dyn CacheBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cache = CacheService::new(cache_backend, config.cache.clone(), &config.circuit_breaker);
        let notifications = Arc::new(NotificationDispatcher::spawn(notifier));

        let venues = VenueCatalog::new(store.clone(), config.catalog.clone());
        let events = EventService::new(store.clone(), cache.clone());
        let availability = AvailabilityService::new(store.clone(), cache.clone());
        let bookings = BookingEngine::new(
            store.clone(),
            availability.clone(),
            cache.clone(),
            notifications.clone(),
            config.booking.clone(),
        );

        Self {
            store,
            cache,
            venues,
            events,
            availability,
            bookings,
            notifications,
            jwt: JwtVerifier::new(&config.jwt.secret),
            config,
            database: None,
        }
    }

    /// Остановка: дослать уведомления и закрыть пул.
    pub async fn shutdown(&self) {
        self.notifications.shutdown().await;
        if let Some(db) = &self.database {
            db.close().await;
        }
        info!("Application state shut down");
    }
}
