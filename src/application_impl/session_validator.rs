use super::AuthConfig;
use crate::application_port::{AuthError, TokenCodec, TokenError};
use crate::domain_model::*;
use crate::domain_port::{Clock, SessionStore};
use std::sync::Arc;

/// Decides whether a presented access token is accepted and, if so, slides
/// the session window forward.
pub struct SessionValidator {
    codec: Arc<dyn TokenCodec>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl SessionValidator {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            codec,
            store,
            clock,
            config,
        }
    }

    pub async fn validate(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self.codec.verify(access_token)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::WrongTokenType {
                expected: TokenKind::Access,
                found: claims.kind,
            });
        }
        let subject_id = claims.subject_id().ok_or(TokenError::MalformedToken)?;

        // Only reached after the token checks out, so a rejected request
        // never extends a session. Store errors propagate as rejections.
        let alive = self
            .store
            .touch_session(subject_id, self.clock.now_seconds(), self.config.access_ttl)
            .await?;
        if !alive {
            return Err(AuthError::SessionNotFound);
        }

        Ok(Identity {
            subject_id,
            display_name: claims.name,
        })
    }
}
