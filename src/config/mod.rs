use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub cache: CacheConfig,
    pub booking: BookingConfig,
    pub catalog: CatalogConfig,
    pub notification: NotificationConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `json` или `pretty`
    pub log_format: String,
}

// Настройки базы данных. Без url работаем на хранилище в памяти
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

// Настройки Redis. Без url кеш живет в памяти процесса
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

// Политики кеша: у списка событий и у доступности свои TTL
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub events_ttl_secs: u64,
    pub availability_ttl_secs: u64,
    /// Размер первой страницы списка событий, которая кешируется
    pub events_page_size: i64,
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub ticket_price: f64,
    /// Оптимистичная проверка по снимку доступности перед транзакцией
    pub precheck: bool,
    pub max_seats_per_booking: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub max_rows: i32,
    pub max_cols: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            rust_log: "seat_booking=debug,tower_http=debug".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 20,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "development-secret".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            events_ttl_secs: 60,
            availability_ttl_secs: 300,
            events_page_size: 100,
            operation_timeout_ms: 250,
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            ticket_price: 150.00,
            precheck: true,
            max_seats_per_booking: 50,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_rows: 26,
            max_cols: 100,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 30,
        }
    }
}

/// Значение переменной окружения или `default`, если переменная не задана.
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            app: AppConfig {
                host: var_or("HOST", defaults.app.host)?,
                port: var_or("PORT", defaults.app.port)?,
                environment: var_or("ENVIRONMENT", defaults.app.environment)?,
                rust_log: var_or("RUST_LOG", defaults.app.rust_log)?,
                log_format: var_or("LOG_FORMAT", defaults.app.log_format)?,
            },
            database: DatabaseConfig {
                url: optional_var("DATABASE_URL"),
                pool_size: var_or("DB_POOL_SIZE", defaults.database.pool_size)?,
                acquire_timeout_secs: var_or(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.database.acquire_timeout_secs,
                )?,
            },
            redis: RedisConfig {
                url: optional_var("REDIS_URL"),
            },
            jwt: JwtConfig {
                secret: var_or("JWT_SECRET", defaults.jwt.secret)?,
            },
            cache: CacheConfig {
                events_ttl_secs: var_or("CACHE_EVENTS_TTL_SECS", defaults.cache.events_ttl_secs)?,
                availability_ttl_secs: var_or(
                    "CACHE_AVAILABILITY_TTL_SECS",
                    defaults.cache.availability_ttl_secs,
                )?,
                events_page_size: var_or("EVENTS_PAGE_SIZE", defaults.cache.events_page_size)?,
                operation_timeout_ms: var_or(
                    "CACHE_OPERATION_TIMEOUT_MS",
                    defaults.cache.operation_timeout_ms,
                )?,
            },
            booking: BookingConfig {
                ticket_price: var_or("TICKET_PRICE", defaults.booking.ticket_price)?,
                precheck: var_or("BOOKING_PRECHECK", defaults.booking.precheck)?,
                max_seats_per_booking: var_or(
                    "MAX_SEATS_PER_BOOKING",
                    defaults.booking.max_seats_per_booking,
                )?,
            },
            catalog: CatalogConfig {
                max_rows: var_or("VENUE_MAX_ROWS", defaults.catalog.max_rows)?,
                max_cols: var_or("VENUE_MAX_COLS", defaults.catalog.max_cols)?,
            },
            notification: NotificationConfig {
                webhook_url: optional_var("NOTIFY_WEBHOOK_URL"),
                timeout_secs: var_or("NOTIFY_TIMEOUT_SECS", defaults.notification.timeout_secs)?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: var_or(
                    "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                    defaults.circuit_breaker.failure_threshold,
                )?,
                timeout_seconds: var_or(
                    "CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                    defaults.circuit_breaker.timeout_seconds,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.events_page_size <= 0 {
            anyhow::bail!("EVENTS_PAGE_SIZE must be positive");
        }
        if self.booking.ticket_price < 0.0 {
            anyhow::bail!("TICKET_PRICE must not be negative");
        }
        if self.catalog.max_rows <= 0 || self.catalog.max_cols <= 0 {
            anyhow::bail!("VENUE_MAX_ROWS and VENUE_MAX_COLS must be positive");
        }
        if self.app.environment == "production" && self.jwt.secret == JwtConfig::default().secret {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        if let Some(url) = &self.database.url {
            if !url.starts_with("postgres") {
                anyhow::bail!("DATABASE_URL must be a postgres:// url");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cache_policies() {
        let config = Config::default();
        assert_eq!(config.cache.events_ttl_secs, 60);
        assert_eq!(config.cache.availability_ttl_secs, 300);
        assert!(config.booking.precheck);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_postgres_database_url() {
        let mut config = Config::default();
        config.database.url = Some("mysql://localhost/db".to_string());
        assert!(config.validate().is_err());
    }
}
