use std::future::Future;
use std::time::Duration;

use super::{CacheService, Cached};
use crate::error::AppResult;
use crate::models::Availability;

pub fn availability_key(event_id: i64) -> String {
    format!("availability:{}", event_id)
}

impl CacheService {
    pub async fn availability<F, Fut>(&self, event_id: i64, load: F) -> AppResult<Cached<Availability>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Availability>>,
    {
        let ttl = Duration::from_secs(self.config.availability_ttl_secs);
        self.read_through(&availability_key(event_id), ttl, load).await
    }

    /// Вызывается после коммита брони для каждого затронутого события.
    pub async fn invalidate_availability(&self, event_id: i64) {
        self.invalidate(&availability_key(event_id)).await;
    }
}
