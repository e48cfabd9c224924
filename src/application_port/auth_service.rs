use crate::domain_model::*;
use crate::domain_port::{DirectoryError, SessionStoreError};

/// Why the token codec refused a token. Carried inside
/// [`AuthError::Token`] so callers can tell expiry from tampering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed credential")]
    MalformedCredential,
    #[error("invalid or expired token: {0}")]
    Token(#[from] TokenError),
    #[error("wrong token type: expected {expected}, found {found}")]
    WrongTokenType { expected: TokenKind, found: TokenKind },
    #[error("session not found")]
    SessionNotFound,
    #[error("refresh token expired or unknown")]
    RefreshExpiredOrUnknown,
    #[error("refresh token already consumed")]
    RefreshConsumed,
    #[error("refresh token replayed, all sessions revoked")]
    SecurityRevocation,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::BadHash(e) => AuthError::InternalError(e),
            DirectoryError::Store(e) => AuthError::StoreUnavailable(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Signs and verifies credential tokens. Pure computation, never touches
/// the store.
pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, AuthError>;
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError>;
    async fn validate(&self, access_token: &str) -> Result<Identity, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn revoke_all(&self, subject_id: SubjectId) -> Result<(), AuthError>;
    async fn session(&self, subject_id: SubjectId) -> Result<Option<SessionRecord>, AuthError>;
}
