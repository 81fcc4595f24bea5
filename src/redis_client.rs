use redis::{aio::ConnectionManager, Client};
use tracing::debug;

/// Подключение к Redis для кеша. Создается один раз при старте и передается
/// в бэкенд кеша явно. `ConnectionManager` сам переподключается после обрыва,
/// поэтому временная недоступность Redis не требует перезапуска сервиса.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_connection_manager().await?;

        // Проверяем соединение сразу, а не на первом запросе
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis answered {}", pong);

        Ok(RedisClient { conn })
    }
}
