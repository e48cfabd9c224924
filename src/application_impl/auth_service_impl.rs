use super::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealAuthService {
    directory: Arc<dyn SubjectDirectory>,
    store: Arc<dyn SessionStore>,
    issuer: Arc<TokenIssuer>,
    validator: SessionValidator,
    coordinator: RefreshCoordinator,
    revocation: Arc<RevocationManager>,
}

impl RealAuthService {
    pub fn new(
        directory: Arc<dyn SubjectDirectory>,
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            codec.clone(),
            store.clone(),
            clock.clone(),
            config.clone(),
        ));
        let revocation = Arc::new(RevocationManager::new(store.clone()));
        let validator =
            SessionValidator::new(codec.clone(), store.clone(), clock, config.clone());
        let coordinator = RefreshCoordinator::new(
            codec,
            store.clone(),
            issuer.clone(),
            revocation.clone(),
            config,
        );

        Self {
            directory,
            store,
            issuer,
            validator,
            coordinator,
            revocation,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError> {
        let LoginInput { username, password } = request;

        let identity = self
            .directory
            .resolve(&username, &password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        debug!(subject_id = %identity.subject_id, "credential resolved");
        self.issuer.issue_pair(identity).await
    }

    async fn validate(&self, access_token: &str) -> Result<Identity, AuthError> {
        self.validator.validate(access_token).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        self.coordinator.refresh(refresh_token).await
    }

    async fn revoke_all(&self, subject_id: SubjectId) -> Result<(), AuthError> {
        self.revocation.revoke_all(subject_id).await
    }

    async fn session(&self, subject_id: SubjectId) -> Result<Option<SessionRecord>, AuthError> {
        Ok(self.store.load_session(subject_id).await?)
    }
}
