use std::time::Duration;

/// Cache for serialized responses, keyed by request fingerprint.
#[async_trait::async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, body: &str, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("infra error: {0}")]
    Store(String),
}
