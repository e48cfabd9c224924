use crate::domain_model::*;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Outcome of the atomic compare-and-swap on a subject's refresh record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    Rotated,
    Missing,
    Mismatch,
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace the session record and set its TTL in one step.
    async fn put_session(
        &self,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn load_session(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Bump `last_active_time` and reset the TTL atomically. Returns `false`
    /// and writes nothing if the session record does not exist.
    async fn touch_session(
        &self,
        subject_id: SubjectId,
        last_active: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError>;

    /// Overwrite the refresh record unconditionally.
    async fn put_refresh(
        &self,
        subject_id: SubjectId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn load_refresh(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<String>, SessionStoreError>;

    /// Replace the refresh record with `replacement` only if it currently
    /// holds exactly `presented`.
    async fn rotate_refresh(
        &self,
        subject_id: SubjectId,
        presented: &str,
        replacement: &str,
        ttl: Duration,
    ) -> Result<RotateOutcome, SessionStoreError>;

    /// Take the per-subject refresh marker if nobody holds it.
    async fn try_lock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError>;

    /// Release the marker if it is still held by `owner`.
    async fn unlock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
    ) -> Result<(), SessionStoreError>;

    /// Delete the session and refresh records. Absent keys are not an error.
    async fn revoke(&self, subject_id: SubjectId) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("corrupt session record: {0}")]
    Corrupt(String),
    #[error("infra error: {0}")]
    Store(String),
}
