use crate::domain_port::ResponseCache;
use crate::logger::*;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use warp::Filter;
use warp::filters::path::FullPath;
use warp::http::{self, HeaderMap, Method};

/// Response cache shared by the read-only routes. It sits after the gate and
/// never influences whether a request is admitted.
pub struct ResponseCacheLayer {
    cache: Arc<dyn ResponseCache>,
    ttl: Duration,
    prefix: String,
}

impl ResponseCacheLayer {
    pub fn new(cache: Arc<dyn ResponseCache>, ttl: Duration, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            ttl,
            prefix: prefix.into(),
        }
    }

    pub fn key(
        &self,
        method: &Method,
        path_and_query: &str,
        authorization: Option<impl AsRef<[u8]>>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(path_and_query.as_bytes());
        hasher.update(b":");
        if let Some(authorization) = authorization {
            hasher.update(authorization.as_ref());
        }
        format!("{}:{}", self.prefix, hex::encode(hasher.finalize()))
    }

    /// Cache failures degrade to a miss.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("response cache read failed: {}", e);
                None
            }
        }
    }

    pub async fn store(&self, key: &str, body: &str) {
        match self.cache.put(key, body, self.ttl).await {
            Ok(()) => debug!(key, "response cached"),
            Err(e) => warn!(key, "response cache write failed: {}", e),
        }
    }
}

/// Fingerprint of the current request for the cache.
pub fn request_key(
    layer: Arc<ResponseCacheLayer>,
) -> impl Filter<Extract = (String,), Error = std::convert::Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(
            warp::query::raw()
                .or(warp::any().map(String::new))
                .unify(),
        )
        .and(warp::header::headers_cloned())
        .map(
            move |method: Method, path: FullPath, query: String, headers: HeaderMap| {
                let path_and_query = if query.is_empty() {
                    path.as_str().to_string()
                } else {
                    format!("{}?{}", path.as_str(), query)
                };
                layer.key(
                    &method,
                    &path_and_query,
                    headers.get(http::header::AUTHORIZATION),
                )
            },
        )
}
