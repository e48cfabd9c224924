use crate::domain_model::*;
use crate::domain_port::{RotateOutcome, SessionStore, SessionStoreError};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Bounds every call on the wrapped store. A call that overruns fails with
/// [`SessionStoreError::Timeout`], which the validator turns into a rejection.
pub struct TimeoutSessionStore {
    inner: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl TimeoutSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, SessionStoreError>>,
    ) -> Result<T, SessionStoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| SessionStoreError::Timeout(self.timeout))?
    }
}

#[async_trait::async_trait]
impl SessionStore for TimeoutSessionStore {
    async fn put_session(
        &self,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.bounded(self.inner.put_session(record, ttl)).await
    }

    async fn load_session(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.bounded(self.inner.load_session(subject_id)).await
    }

    async fn touch_session(
        &self,
        subject_id: SubjectId,
        last_active: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        self.bounded(self.inner.touch_session(subject_id, last_active, ttl))
            .await
    }

    async fn put_refresh(
        &self,
        subject_id: SubjectId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.bounded(self.inner.put_refresh(subject_id, token, ttl))
            .await
    }

    async fn load_refresh(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<String>, SessionStoreError> {
        self.bounded(self.inner.load_refresh(subject_id)).await
    }

    async fn rotate_refresh(
        &self,
        subject_id: SubjectId,
        presented: &str,
        replacement: &str,
        ttl: Duration,
    ) -> Result<RotateOutcome, SessionStoreError> {
        self.bounded(
            self.inner
                .rotate_refresh(subject_id, presented, replacement, ttl),
        )
        .await
    }

    async fn try_lock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        self.bounded(self.inner.try_lock_refresh(subject_id, owner, ttl))
            .await
    }

    async fn unlock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
    ) -> Result<(), SessionStoreError> {
        self.bounded(self.inner.unlock_refresh(subject_id, owner))
            .await
    }

    async fn revoke(&self, subject_id: SubjectId) -> Result<(), SessionStoreError> {
        self.bounded(self.inner.revoke(subject_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    /// Never answers.
    struct StalledStore;

    #[async_trait::async_trait]
    impl SessionStore for StalledStore {
        async fn put_session(&self, _: &SessionRecord, _: Duration) -> Result<(), SessionStoreError> {
            pending().await
        }

        async fn load_session(
            &self,
            _: SubjectId,
        ) -> Result<Option<SessionRecord>, SessionStoreError> {
            pending().await
        }

        async fn touch_session(
            &self,
            _: SubjectId,
            _: DateTime<Utc>,
            _: Duration,
        ) -> Result<bool, SessionStoreError> {
            pending().await
        }

        async fn put_refresh(&self, _: SubjectId, _: &str, _: Duration) -> Result<(), SessionStoreError> {
            pending().await
        }

        async fn load_refresh(&self, _: SubjectId) -> Result<Option<String>, SessionStoreError> {
            pending().await
        }

        async fn rotate_refresh(
            &self,
            _: SubjectId,
            _: &str,
            _: &str,
            _: Duration,
        ) -> Result<RotateOutcome, SessionStoreError> {
            pending().await
        }

        async fn try_lock_refresh(
            &self,
            _: SubjectId,
            _: &str,
            _: Duration,
        ) -> Result<bool, SessionStoreError> {
            pending().await
        }

        async fn unlock_refresh(&self, _: SubjectId, _: &str) -> Result<(), SessionStoreError> {
            pending().await
        }

        async fn revoke(&self, _: SubjectId) -> Result<(), SessionStoreError> {
            pending().await
        }
    }

    #[tokio::test]
    async fn stalled_store_times_out() {
        let timeout = Duration::from_millis(20);
        let store = TimeoutSessionStore::new(Arc::new(StalledStore), timeout);
        let subject_id = SubjectId::from_name("u1");

        let touched = store
            .touch_session(subject_id, Utc::now(), Duration::from_secs(900))
            .await;
        assert!(matches!(touched, Err(SessionStoreError::Timeout(t)) if t == timeout));

        let revoked = store.revoke(subject_id).await;
        assert!(matches!(revoked, Err(SessionStoreError::Timeout(_))));
    }
}
