use crate::application_port::AuthError;
use crate::domain_model::SubjectId;
use crate::domain_port::SessionStore;
use crate::logger::*;
use std::sync::Arc;

pub struct RevocationManager {
    store: Arc<dyn SessionStore>,
}

impl RevocationManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Drop every piece of store-side state for `subject_id`. Outstanding
    /// access tokens stop validating immediately. Idempotent.
    pub async fn revoke_all(&self, subject_id: SubjectId) -> Result<(), AuthError> {
        self.store.revoke(subject_id).await?;
        info!(%subject_id, "all sessions revoked");
        Ok(())
    }
}
