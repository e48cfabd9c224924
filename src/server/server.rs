use crate::api::v1::{RequestGate, ResponseCacheLayer};
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Everything the routes need, built once at startup.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub gate: Arc<RequestGate>,
    pub response_cache: Arc<ResponseCacheLayer>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (session_store, response_cache) = match settings.store.backend.as_str() {
            "redis" => {
                let redis_client = redis::Client::open(settings.store.redis_url.as_str())?;
                let mut redis_manager = redis_client.get_connection_manager().await?;
                let pong: String = redis::cmd("PING").query_async(&mut redis_manager).await?;
                info!("redis PING -> {}", pong);

                let session_store: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
                    redis_manager.clone(),
                    settings.store.key_prefix.clone(),
                ));
                let response_cache: Arc<dyn ResponseCache> =
                    Arc::new(RedisResponseCache::new(redis_manager));
                (session_store, response_cache)
            }
            "memory" => {
                warn!("in-memory session store, sessions are lost on restart");
                let session_store: Arc<dyn SessionStore> =
                    Arc::new(MemorySessionStore::new(clock.clone()));
                let response_cache: Arc<dyn ResponseCache> =
                    Arc::new(MemoryResponseCache::new(clock.clone()));
                (session_store, response_cache)
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };
        let session_store: Arc<dyn SessionStore> = Arc::new(TimeoutSessionStore::new(
            session_store,
            settings.auth.store_timeout(),
        ));

        let directory: Arc<dyn SubjectDirectory> = match settings.directory.backend.as_str() {
            "fake" => Arc::new(FakeSubjectDirectory::new()),
            "static" => Arc::new(StaticSubjectDirectory::new(
                settings.directory.users.clone(),
                Arc::new(Argon2PasswordHasher),
            )),
            other => return Err(anyhow::anyhow!("Unknown directory backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::try_new(
            JwtConfig {
                signing_key: settings.auth.signing_secret.clone().into_bytes(),
            },
            clock.clone(),
        )?);

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            directory,
            token_codec,
            session_store,
            clock,
            settings.auth.auth_config()?,
        ));

        Ok(Self::from_parts(
            auth_service,
            settings.auth.excluded_paths.clone(),
            ResponseCacheLayer::new(
                response_cache,
                Duration::from_secs(settings.cache.ttl_secs),
                settings.cache.prefix.clone(),
            ),
        ))
    }

    pub fn from_parts(
        auth_service: Arc<dyn AuthService>,
        excluded_paths: Vec<String>,
        response_cache: ResponseCacheLayer,
    ) -> Self {
        let gate = Arc::new(RequestGate::new(excluded_paths, auth_service.clone()));
        Server {
            auth_service,
            gate,
            response_cache: Arc::new(response_cache),
        }
    }
}
