//! Кеш чтения перед расчетом доступности и списком событий.
//!
//! Две независимые политики:
//! - `events_list` - первая страница ближайших событий, короткий TTL,
//!   сбрасывается при создании события;
//! - `availability:{event_id}` - снимок доступности, длинный TTL,
//!   сбрасывается после каждой успешной брони на это событие.
//!
//! Кеш только ускоряет чтение. Любой сбой бэкенда поглощается здесь же,
//! запрос уходит напрямую в хранилище.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, CircuitBreakerConfig};
use crate::error::AppResult;
use crate::services::circuit_breaker::CircuitBreaker;

pub mod availability;
pub mod backend;
pub mod events;

pub use backend::{MemoryCacheBackend, RedisCacheBackend};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache backend is temporarily bypassed")]
    CircuitOpen,
    #[error("cache operation timed out")]
    Timeout,
    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Откуда пришел ответ. Уходит клиенту в заголовке `X-Cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Кеш недоступен, значение посчитано напрямую и не сохранено.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    breaker: Arc<CircuitBreaker>,
    config: CacheConfig,
}

impl CacheService {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        config: CacheConfig,
        breaker_config: &CircuitBreakerConfig,
    ) -> Self {
        Self {
            backend,
            breaker: Arc::new(CircuitBreaker::from_config("cache", breaker_config)),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Вызов бэкенда с таймаутом и учетом в выключателе.
    async fn call<T, Fut>(&self, op: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let timeout = Duration::from_millis(self.config.operation_timeout_ms);
        match tokio::time::timeout(timeout, op).await {
            Ok(Ok(value)) => {
                self.breaker.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.breaker.record_failure();
                Err(e)
            }
            Err(_) => {
                self.breaker.record_failure();
                Err(CacheError::Timeout)
            }
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        if !self.breaker.can_execute() {
            return Err(CacheError::CircuitOpen);
        }
        self.call(self.backend.get(key)).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if !self.breaker.can_execute() {
            return Err(CacheError::CircuitOpen);
        }
        self.call(self.backend.set_ex(key, value, ttl)).await
    }

    /// Удалить ключ. Идет мимо выключателя: инвалидацию пробуем всегда.
    async fn invalidate(&self, key: &str) {
        match self.call(self.backend.del(key)).await {
            Ok(()) => info!("CACHE INVALIDATED for key: {}", key),
            Err(e) => warn!("Failed to invalidate cache key {}: {}", key, e),
        }
    }

    /// Read-through: на попадании отдаем сохраненное значение, на промахе
    /// считаем через `load`, кладем с `ttl` и возвращаем. Ошибки `load`
    /// не кешируются.
    async fn read_through<T, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> AppResult<Cached<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut bypass = false;

        match self.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("CACHE HIT for key: {}", key);
                    return Ok(Cached {
                        value,
                        status: CacheStatus::Hit,
                    });
                }
                Err(e) => {
                    warn!("Dropping undecodable cache entry {}: {}", key, e);
                    self.invalidate(key).await;
                }
            },
            Ok(None) => debug!("CACHE MISS for key: {}", key),
            Err(e) => {
                debug!("Cache bypassed for key {}: {}", key, e);
                bypass = true;
            }
        }

        let value = load().await?;

        if bypass {
            return Ok(Cached {
                value,
                status: CacheStatus::Bypass,
            });
        }

        match serde_json::to_string(&value) {
            Ok(raw) => match self.set_raw(key, &raw, ttl).await {
                Ok(()) => debug!("CACHE SET for key: {}", key),
                Err(e) => warn!("Failed to cache key {}: {}", key, e),
            },
            Err(e) => warn!("Failed to serialize value for key {}: {}", key, e),
        }

        Ok(Cached {
            value,
            status: CacheStatus::Miss,
        })
    }
}
