use crate::application_impl::{AuthConfig, StoreWritePolicy};
use crate::infra_memory::StaticSubject;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    #[serde(default)]
    pub cache: Cache,
    pub directory: Directory,
    pub http: Http,
    pub log: Log,
    pub store: Store,
}

#[derive(Deserialize)]
pub struct Auth {
    pub signing_secret: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_refresh_lock_ttl_ms")]
    pub refresh_lock_ttl_ms: u64,
    #[serde(default = "default_true")]
    pub fail_login_on_store_error: bool,
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("signing_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("refresh_lock_ttl_ms", &self.refresh_lock_ttl_ms)
            .field("fail_login_on_store_error", &self.fail_login_on_store_error)
            .field("excluded_paths", &self.excluded_paths)
            .finish()
    }
}

impl Auth {
    pub fn auth_config(&self) -> Result<AuthConfig> {
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs > MAX_TTL_SECS {
            return Err(anyhow!(
                "auth ttls must lie in 1..={} seconds, got access={} refresh={}",
                MAX_TTL_SECS,
                self.access_ttl_secs,
                self.refresh_ttl_secs
            ));
        }
        if self.access_ttl_secs > self.refresh_ttl_secs {
            return Err(anyhow!(
                "access_ttl_secs ({}) exceeds refresh_ttl_secs ({})",
                self.access_ttl_secs,
                self.refresh_ttl_secs
            ));
        }
        Ok(AuthConfig {
            access_ttl: Duration::from_secs(self.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_ttl_secs),
            refresh_lock_ttl: Duration::from_millis(self.refresh_lock_ttl_ms),
            store_write_policy: if self.fail_login_on_store_error {
                StoreWritePolicy::FailClosed
            } else {
                StoreWritePolicy::Degrade
            },
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            ttl_secs: default_cache_ttl_secs(),
            prefix: default_cache_prefix(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    pub backend: String, // "fake" or "static"
    #[serde(default)]
    pub users: Vec<StaticSubject>,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "redis" or "memory"
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default)]
    pub key_prefix: String,
}

/// One year.
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_access_ttl_secs() -> u64 {
    15 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_store_timeout_ms() -> u64 {
    500
}

fn default_refresh_lock_ttl_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_excluded_paths() -> Vec<String> {
    vec!["/api/v1/login".to_string(), "/api/v1/refresh".to_string()]
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_prefix() -> String {
    "cache".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Load settings from `path` (or the build's default file), then apply
/// `SESSIOND_<SECTION>__<KEY>` environment overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("SESSIOND").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
