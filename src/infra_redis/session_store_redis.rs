use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;

const SESSION_TOUCH: &str = include_str!("session_touch.lua");
const REFRESH_ROTATE: &str = include_str!("refresh_rotate.lua");
const REFRESH_UNLOCK: &str = include_str!("refresh_unlock.lua");

const F_SUBJECT_ID: &str = "subject_id";
const F_DISPLAY_NAME: &str = "display_name";
const F_LOGIN_TIME: &str = "login_time";
const F_LAST_ACTIVE: &str = "last_active";

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, namespace: &str, subject_id: SubjectId) -> String {
        if self.prefix.is_empty() {
            format!("{}:{}", namespace, subject_id)
        } else {
            format!("{}:{}:{}", self.prefix, namespace, subject_id)
        }
    }

    fn session_key(&self, subject_id: SubjectId) -> String {
        self.key("session", subject_id)
    }

    fn refresh_key(&self, subject_id: SubjectId) -> String {
        self.key("refresh", subject_id)
    }

    fn lock_key(&self, subject_id: SubjectId) -> String {
        self.key("refresh_lock", subject_id)
    }
}

fn millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

fn parse_time(fields: &HashMap<String, String>, name: &str) -> Result<DateTime<Utc>, SessionStoreError> {
    fields
        .get(name)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| SessionStoreError::Corrupt(format!("bad field {}", name)))
}

fn parse_record(fields: HashMap<String, String>) -> Result<SessionRecord, SessionStoreError> {
    let subject_id = fields
        .get(F_SUBJECT_ID)
        .and_then(|v| v.parse::<SubjectId>().ok())
        .ok_or_else(|| SessionStoreError::Corrupt(format!("bad field {}", F_SUBJECT_ID)))?;
    Ok(SessionRecord {
        subject_id,
        display_name: fields.get(F_DISPLAY_NAME).cloned(),
        login_time: parse_time(&fields, F_LOGIN_TIME)?,
        last_active_time: parse_time(&fields, F_LAST_ACTIVE)?,
    })
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put_session(
        &self,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let key = self.session_key(record.subject_id);
        let mut fields = vec![
            (F_SUBJECT_ID, record.subject_id.to_string()),
            (F_LOGIN_TIME, record.login_time.timestamp().to_string()),
            (F_LAST_ACTIVE, record.last_active_time.timestamp().to_string()),
        ];
        if let Some(name) = &record.display_name {
            fields.push((F_DISPLAY_NAME, name.clone()));
        }

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields[..])
            .ignore()
            .pexpire(&key, millis(ttl))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn load_session(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let key = self.session_key(subject_id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        if fields.is_empty() {
            return Ok(None);
        }
        parse_record(fields).map(Some)
    }

    async fn touch_session(
        &self,
        subject_id: SubjectId,
        last_active: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        let key = self.session_key(subject_id);
        let mut conn = self.conn.clone();
        let touched: i64 = Script::new(SESSION_TOUCH)
            .key(&key)
            .arg(last_active.timestamp())
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(touched == 1)
    }

    async fn put_refresh(
        &self,
        subject_id: SubjectId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let key = self.refresh_key(subject_id);
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(&key, token, millis(ttl) as u64)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn load_refresh(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<String>, SessionStoreError> {
        let key = self.refresh_key(subject_id);
        let mut conn = self.conn.clone();
        conn.get(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))
    }

    async fn rotate_refresh(
        &self,
        subject_id: SubjectId,
        presented: &str,
        replacement: &str,
        ttl: Duration,
    ) -> Result<RotateOutcome, SessionStoreError> {
        let key = self.refresh_key(subject_id);
        let mut conn = self.conn.clone();
        let status: i64 = Script::new(REFRESH_ROTATE)
            .key(&key)
            .arg(presented)
            .arg(replacement)
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        match status {
            1 => Ok(RotateOutcome::Rotated),
            0 => Ok(RotateOutcome::Mismatch),
            -1 => Ok(RotateOutcome::Missing),
            other => Err(SessionStoreError::Store(format!(
                "unknown rotate status {}",
                other
            ))),
        }
    }

    async fn try_lock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SessionStoreError> {
        let key = self.lock_key(subject_id);
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(owner)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(reply.is_some())
    }

    async fn unlock_refresh(
        &self,
        subject_id: SubjectId,
        owner: &str,
    ) -> Result<(), SessionStoreError> {
        let key = self.lock_key(subject_id);
        let mut conn = self.conn.clone();
        let _: i64 = Script::new(REFRESH_UNLOCK)
            .key(&key)
            .arg(owner)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn revoke(&self, subject_id: SubjectId) -> Result<(), SessionStoreError> {
        let keys = [self.session_key(subject_id), self.refresh_key(subject_id)];
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&keys)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_hash_fields() {
        let subject_id = SubjectId::from_name("u1");
        let mut fields = HashMap::new();
        fields.insert(F_SUBJECT_ID.to_string(), subject_id.to_string());
        fields.insert(F_LOGIN_TIME.to_string(), "1704067200".to_string());
        fields.insert(F_LAST_ACTIVE.to_string(), "1704067260".to_string());

        let record = parse_record(fields).unwrap();
        assert_eq!(record.subject_id, subject_id);
        assert_eq!(record.display_name, None);
        assert_eq!(
            (record.last_active_time - record.login_time).num_seconds(),
            60
        );
    }

    #[test]
    fn missing_field_is_corrupt() {
        let mut fields = HashMap::new();
        fields.insert(F_SUBJECT_ID.to_string(), "not-a-uuid".to_string());
        assert!(matches!(
            parse_record(fields),
            Err(SessionStoreError::Corrupt(_))
        ));
    }
}
