use crate::domain_port::DirectoryError;

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, DirectoryError>;
    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, DirectoryError>;
}
