use crate::application_port::CredentialHasher;
use crate::domain_model::{Identity, SubjectId};
use crate::domain_port::{DirectoryError, SubjectDirectory};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct StaticSubject {
    pub username: String,
    /// argon2 PHC string, see the `hash-password` binary.
    pub password_hash: String,
    pub subject_id: SubjectId,
    pub display_name: Option<String>,
}

/// Directory backed by a fixed list of accounts from the settings file.
pub struct StaticSubjectDirectory {
    subjects: HashMap<String, StaticSubject>,
    hasher: Arc<dyn CredentialHasher>,
}

impl StaticSubjectDirectory {
    pub fn new(subjects: Vec<StaticSubject>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let subjects = subjects
            .into_iter()
            .map(|s| (s.username.clone(), s))
            .collect();
        Self { subjects, hasher }
    }
}

#[async_trait::async_trait]
impl SubjectDirectory for StaticSubjectDirectory {
    async fn resolve(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, DirectoryError> {
        let Some(subject) = self.subjects.get(username) else {
            return Ok(None);
        };
        if !self
            .hasher
            .verify_password(password, &subject.password_hash)
            .await?
        {
            return Ok(None);
        }
        Ok(Some(Identity {
            subject_id: subject.subject_id,
            display_name: subject.display_name.clone(),
        }))
    }
}

/// Accepts any non-empty username and password. The subject id is derived
/// from the username, so logging in twice yields the same subject.
#[derive(Debug, Default)]
pub struct FakeSubjectDirectory;

impl FakeSubjectDirectory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SubjectDirectory for FakeSubjectDirectory {
    async fn resolve(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, DirectoryError> {
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }
        Ok(Some(Identity {
            subject_id: SubjectId::from_name(username),
            display_name: Some(username.to_string()),
        }))
    }
}
