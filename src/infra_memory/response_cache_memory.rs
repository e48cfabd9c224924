use crate::domain_port::{CacheError, Clock, ResponseCache};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct MemoryResponseCache {
    entries: DashMap<String, (String, DateTime<Utc>)>,
    clock: Arc<dyn Clock>,
}

impl MemoryResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryResponseCache {
            entries: DashMap::new(),
            clock,
        }
    }
}

#[async_trait::async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone()))
    }

    async fn put(&self, key: &str, body: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.1 > now);
        self.entries
            .insert(key.to_string(), (body.to_string(), now + ttl));
        Ok(())
    }
}
