use std::time::Duration;

/// What the issuer does when the session or refresh record cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWritePolicy {
    /// Fail the login or refresh with `StoreUnavailable`.
    FailClosed,
    /// Log and hand out the pair anyway. Such tokens verify but will be
    /// rejected by the validator until the client logs in again.
    Degrade,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub refresh_lock_ttl: Duration,
    pub store_write_policy: StoreWritePolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            refresh_lock_ttl: Duration::from_secs(5),
            store_write_policy: StoreWritePolicy::FailClosed,
        }
    }
}
