use crate::domain_port::{CacheError, ResponseCache};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

pub struct RedisResponseCache {
    conn: ConnectionManager,
}

impl RedisResponseCache {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisResponseCache { conn }
    }
}

#[async_trait::async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))
    }

    async fn put(&self, key: &str, body: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let _: () = conn
            .pset_ex(key, body, millis)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;
        Ok(())
    }
}
