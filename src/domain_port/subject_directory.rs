use crate::domain_model::Identity;

/// Resolves a presented login credential to a subject. Backed by the user
/// records store in production.
#[async_trait::async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn resolve(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("invalid password hash: {0}")]
    BadHash(String),
    #[error("infra error: {0}")]
    Store(String),
}
