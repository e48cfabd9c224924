use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

enum Value {
    Session(SessionRecord),
    Text(String),
}

struct Slot {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-process stand-in for the key-value store, for tests and single-node
/// development. Keys expire against the injected clock; each operation runs
/// under the shard lock of its key, so single-key operations are atomic.
pub struct MemorySessionStore {
    entries: DashMap<String, Slot>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemorySessionStore {
            entries: DashMap::new(),
            clock,
        }
    }

    fn session_key(subject_id: SubjectId) -> String {
        format!("session:{}", subject_id)
    }

    fn refresh_key(subject_id: SubjectId) -> String {
        format!("refresh:{}", subject_id)
    }

    fn lock_key(subject_id: SubjectId) -> String {
        format!("refresh_lock:{}", subject_id)
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        self.clock.now() + ttl
    }

    /// Drop every key whose TTL has run out.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, slot| slot.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read_text(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(slot) if slot.expires_at > now => match &slot.value {
                Value::Text(text) => Ok(Some(text.clone())),
                Value::Session(_) => Err(SessionStoreError::Corrupt(key.to_string())),
            },
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put_session(
        &self,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.purge_expired();
        self.entries.insert(
            Self::session_key(record.subject_id),
            Slot {
                value: Value::Session(record.clone()),
                expires_at: self.expiry(ttl),
            },
        );
        Ok(())
    }

    async fn load_session(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let key = Self::session_key(subject_id);
        let now = self.clock.now();
        match self.entries.get(&key) {
            Some(slot) if slot.expires_at > now => match &slot.value {
                Value::Session(record) => Ok(Some(record.clone())),
                Value::Text(_) => Err(SessionStoreError::Corrupt(key)),
            },
            _ => Ok(None),
        }
    }

    async fn touch_session(
        &self,
        subject_id: SubjectId,
        last_active: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        let key = Self::session_key(subject_id);
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        match self.entries.get_mut(&key) {
            Some(mut slot) if slot.expires_at > now => {
                let Value::Session(record) = &mut slot.value else {
                    return Err(SessionStoreError::Corrupt(key));
                };
                record.last_active_time = last_active;
                slot.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn put_refresh(
        &self,
        subject_id: SubjectId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.entries.insert(
            Self::refresh_key(subject_id),
            Slot {
                value: Value::Text(token.to_string()),
                expires_at: self.expiry(ttl),
            },
        );
        Ok(())
    }

    async fn load_refresh(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<String>, SessionStoreError> {
        self.read_text(&Self::refresh_key(subject_id))
    }

    async fn rotate_refresh(
        &self,
        subject_id: SubjectId,
        presented: &str,
        replacement: &str,
        ttl: Duration,
    ) -> Result<RotateOutcome, SessionStoreError> {
        let key = Self::refresh_key(subject_id);
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        match self.entries.get_mut(&key) {
            Some(mut slot) if slot.expires_at > now => {
                let Value::Text(current) = &slot.value else {
                    return Err(SessionStoreError::Corrupt(key));
                };
                if current != presented {
                    return Ok(RotateOutcome::Mismatch);
                }
                slot.value = Value::Text(replacement.to_string());
                slot.expires_at = expires_at;
                Ok(RotateOutcome::Rotated)
            }
            _ => Ok(RotateOutcome::Missing),
        }
    }

    async fn try_lock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        let now = self.clock.now();
        let slot = Slot {
            value: Value::Text(owner.to_string()),
            expires_at: self.expiry(ttl),
        };
        match self.entries.entry(Self::lock_key(subject_id)) {
            Entry::Occupied(mut held) => {
                if held.get().expires_at > now {
                    return Ok(false);
                }
                held.insert(slot);
                Ok(true)
            }
            Entry::Vacant(free) => {
                free.insert(slot);
                Ok(true)
            }
        }
    }

    async fn unlock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
    ) -> Result<(), SessionStoreError> {
        self.entries.remove_if(&Self::lock_key(subject_id), |_, slot| {
            matches!(&slot.value, Value::Text(held) if held == owner)
        });
        Ok(())
    }

    async fn revoke(&self, subject_id: SubjectId) -> Result<(), SessionStoreError> {
        self.entries.remove(&Self::session_key(subject_id));
        self.entries.remove(&Self::refresh_key(subject_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::ManualClock;

    fn store() -> (MemorySessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemorySessionStore::new(clock.clone()), clock)
    }

    fn record(clock: &ManualClock) -> SessionRecord {
        SessionRecord::started(
            SubjectId::from_name("u1"),
            Some("u1".to_string()),
            clock.now_seconds(),
        )
    }

    #[tokio::test]
    async fn session_expires_at_ttl() {
        let (store, clock) = store();
        let record = record(&clock);
        let ttl = Duration::from_secs(10);
        store.put_session(&record, ttl).await.unwrap();

        clock.advance(Duration::from_secs(9));
        assert_eq!(
            store.load_session(record.subject_id).await.unwrap(),
            Some(record.clone())
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.load_session(record.subject_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn touch_slides_ttl_and_updates_last_active() {
        let (store, clock) = store();
        let record = record(&clock);
        let ttl = Duration::from_secs(10);
        store.put_session(&record, ttl).await.unwrap();

        clock.advance(Duration::from_secs(8));
        let now = clock.now_seconds();
        assert!(store.touch_session(record.subject_id, now, ttl).await.unwrap());

        clock.advance(Duration::from_secs(8));
        let loaded = store.load_session(record.subject_id).await.unwrap().unwrap();
        assert_eq!(loaded.last_active_time, now);
        assert_eq!(loaded.login_time, record.login_time);
    }

    #[tokio::test]
    async fn touch_never_resurrects_a_session() {
        let (store, clock) = store();
        let subject_id = SubjectId::from_name("ghost");
        let touched = store
            .touch_session(subject_id, clock.now(), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!touched);
        assert_eq!(store.load_session(subject_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rotate_compares_then_swaps() {
        let (store, _) = store();
        let subject_id = SubjectId::from_name("u1");
        let ttl = Duration::from_secs(60);

        assert_eq!(
            store.rotate_refresh(subject_id, "r1", "r2", ttl).await.unwrap(),
            RotateOutcome::Missing
        );

        store.put_refresh(subject_id, "r1", ttl).await.unwrap();
        assert_eq!(
            store.rotate_refresh(subject_id, "r1", "r2", ttl).await.unwrap(),
            RotateOutcome::Rotated
        );
        assert_eq!(
            store.rotate_refresh(subject_id, "r1", "r3", ttl).await.unwrap(),
            RotateOutcome::Mismatch
        );
        assert_eq!(
            store.load_refresh(subject_id).await.unwrap().as_deref(),
            Some("r2")
        );
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released_or_expired() {
        let (store, clock) = store();
        let subject_id = SubjectId::from_name("u1");
        let ttl = Duration::from_secs(5);

        assert!(store.try_lock_refresh(subject_id, "a", ttl).await.unwrap());
        assert!(!store.try_lock_refresh(subject_id, "b", ttl).await.unwrap());

        // only the owner can release
        store.unlock_refresh(subject_id, "b").await.unwrap();
        assert!(!store.try_lock_refresh(subject_id, "b", ttl).await.unwrap());

        store.unlock_refresh(subject_id, "a").await.unwrap();
        assert!(store.try_lock_refresh(subject_id, "b", ttl).await.unwrap());

        clock.advance(ttl);
        assert!(store.try_lock_refresh(subject_id, "c", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (store, clock) = store();
        let record = record(&clock);
        let ttl = Duration::from_secs(60);
        store.put_session(&record, ttl).await.unwrap();
        store.put_refresh(record.subject_id, "r1", ttl).await.unwrap();

        store.revoke(record.subject_id).await.unwrap();
        store.revoke(record.subject_id).await.unwrap();

        assert_eq!(store.load_session(record.subject_id).await.unwrap(), None);
        assert_eq!(store.load_refresh(record.subject_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_drops_expired_keys() {
        let (store, clock) = store();
        let subject_id = SubjectId::from_name("u1");
        store
            .put_refresh(subject_id, "r1", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        clock.advance(Duration::from_secs(1));
        store.purge_expired();
        assert!(store.is_empty());
    }
}
