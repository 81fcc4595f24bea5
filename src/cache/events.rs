use std::future::Future;
use std::time::Duration;

use super::{CacheService, Cached};
use crate::error::AppResult;
use crate::models::Event;

pub const EVENTS_LIST_KEY: &str = "events_list";

impl CacheService {
    /// Первая страница ближайших событий. Заполненность залов здесь не видна,
    /// поэтому брони этот ключ не трогают.
    pub async fn events_list<F, Fut>(&self, load: F) -> AppResult<Cached<Vec<Event>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<Event>>>,
    {
        let ttl = Duration::from_secs(self.config.events_ttl_secs);
        self.read_through(EVENTS_LIST_KEY, ttl, load).await
    }

    /// Состав списка изменился - новое событие.
    pub async fn invalidate_events_list(&self) {
        self.invalidate(EVENTS_LIST_KEY).await;
    }
}
