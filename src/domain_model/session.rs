use super::SubjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Store-side metadata for a live session. Its TTL is the access-token
/// lifetime and slides forward on every accepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub subject_id: SubjectId,
    pub display_name: Option<String>,
    pub login_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
}

impl SessionRecord {
    pub fn started(
        subject_id: SubjectId,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        SessionRecord {
            subject_id,
            display_name,
            login_time: now,
            last_active_time: now,
        }
    }
}
