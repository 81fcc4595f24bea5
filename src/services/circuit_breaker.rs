//! Автоматический выключатель (Circuit Breaker) для внешних зависимостей.
//!
//! Сейчас им защищен бэкенд кеша: если Redis перестал отвечать, мы не ждем
//! таймаут на каждом запросе, а сразу идем мимо кеша до истечения паузы.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;

/// Состояния выключателя.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// **Closed**: нормальный режим, запросы разрешены.
    Closed,
    /// **Open**: после серии сбоев запросы временно запрещены.
    Open,
    /// **HalfOpen**: пауза истекла, пропускаем один пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    opened_at: Option<Instant>,
    /// Когда ушел пробный запрос. Если его future бросили, слот освобождается
    /// по истечении `open_timeout`.
    trial_started_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    inner: Mutex<Inner>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Порог сбоев, после которого выключатель размыкается.
    failure_threshold: u32,
    /// Сколько держать выключатель разомкнутым перед пробным запросом.
    open_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
                trial_started_at: None,
            }),
            failure_count: AtomicU32::new(0),
            failure_threshold: failure_threshold.max(1),
            open_timeout,
        }
    }

    pub fn from_config(name: &'static str, config: &CircuitBreakerConfig) -> Self {
        Self::new(
            name,
            config.failure_threshold,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Отравленный мьютекс здесь не страшен: внутри только флаги
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Можно ли сейчас обращаться к зависимости.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.open_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started_at = Some(Instant::now());
                    info!("Circuit breaker [{}] transitioning to HalfOpen state", self.name);
                    true
                } else {
                    false
                }
            }
            // Пробный запрос уже ушел - остальные ждут его результата,
            // но не дольше `open_timeout`
            CircuitState::HalfOpen => {
                let stale = inner
                    .trial_started_at
                    .map_or(true, |started| started.elapsed() >= self.open_timeout);
                if stale {
                    if inner.trial_started_at.is_some() {
                        warn!("Circuit breaker [{}] trial request abandoned - allowing a new one", self.name);
                    }
                    inner.trial_started_at = Some(Instant::now());
                }
                stale
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        self.failure_count.store(0, Ordering::Relaxed);
        if inner.state != CircuitState::Closed {
            info!("Circuit breaker [{}] recovered - transitioning to Closed state", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.trial_started_at = None;
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed if failures >= self.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                warn!(
                    "Circuit breaker [{}] OPENED - {} failures reached threshold {}",
                    self.name, failures, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_started_at = None;
                warn!("Circuit breaker [{}] trial request failed - returning to Open state", self.name);
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }
}
