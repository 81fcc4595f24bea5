use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheService, CacheStatus, Cached};
use crate::config::CacheConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Actor, Event, NewEvent, UserRole};
use crate::store::InventoryStore;

/// Полночь текущих суток по UTC: события этого дня еще считаются ближайшими.
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn InventoryStore>,
    cache: CacheService,
    config: CacheConfig,
}

impl EventService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: CacheService) -> Self {
        let config = cache.config().clone();
        Self {
            store,
            cache,
            config,
        }
    }

    pub async fn create_event(&self, actor: &Actor, event: NewEvent) -> AppResult<Event> {
        actor.require(UserRole::Organizer)?;
        if event.name.trim().is_empty() {
            return Err(AppError::Validation("Event name must not be empty".to_string()));
        }

        let venue = self
            .store
            .get_venue(event.venue_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venue {} not found", event.venue_id)))?;

        let created = self.store.create_event(actor.user_id, &event).await?;
        info!(
            "Event {} created at venue {} by organizer {}",
            created.id, venue.id, actor.user_id
        );

        self.cache.invalidate_events_list().await;
        Ok(created)
    }

    pub async fn get_event(&self, event_id: i64) -> AppResult<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))
    }

    async fn load_page(&self, offset: i64, limit: i64) -> AppResult<Vec<Event>> {
        let from = start_of_utc_day(Utc::now());
        Ok(self.store.list_upcoming_events(from, offset, limit).await?)
    }

    /// Ближайшие события. В кеш попадает только первая страница стандартного размера,
    /// остальные страницы всегда читаются из хранилища.
    pub async fn list_upcoming_events(&self, offset: i64, limit: i64) -> AppResult<Cached<Vec<Event>>> {
        let offset = offset.max(0);
        let limit = limit.clamp(1, self.config.events_page_size.max(1));

        if offset == 0 && limit == self.config.events_page_size {
            return self
                .cache
                .events_list(|| self.load_page(0, self.config.events_page_size))
                .await;
        }

        Ok(Cached {
            value: self.load_page(offset, limit).await?,
            status: CacheStatus::Bypass,
        })
    }

    /// Прогрев `events_list` при старте. Ошибки только логируются.
    pub async fn warmup_cache(&self) {
        match self.list_upcoming_events(0, self.config.events_page_size).await {
            Ok(page) => info!(
                "Events list cache warmed: {} events ({})",
                page.value.len(),
                page.status.as_str()
            ),
            Err(e) => warn!("Failed to warm events list cache: {}", e),
        }
    }
}
