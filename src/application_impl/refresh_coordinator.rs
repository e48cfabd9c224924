use super::{AuthConfig, MintedPair, RevocationManager, TokenIssuer};
use crate::application_port::{AuthError, TokenCodec, TokenError};
use crate::domain_model::*;
use crate::domain_port::{RotateOutcome, SessionStore};
use crate::logger::*;
use nanoid::nanoid;
use std::sync::Arc;

/// Exchanges a refresh token for a new pair. Each refresh token is single
/// use: presenting one that has been superseded is treated as theft and
/// revokes the subject's sessions.
pub struct RefreshCoordinator {
    codec: Arc<dyn TokenCodec>,
    store: Arc<dyn SessionStore>,
    issuer: Arc<TokenIssuer>,
    revocation: Arc<RevocationManager>,
    config: AuthConfig,
}

impl RefreshCoordinator {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn SessionStore>,
        issuer: Arc<TokenIssuer>,
        revocation: Arc<RevocationManager>,
        config: AuthConfig,
    ) -> Self {
        Self {
            codec,
            store,
            issuer,
            revocation,
            config,
        }
    }

    pub async fn refresh(&self, presented: &str) -> Result<AuthTokens, AuthError> {
        let claims = self.codec.verify(presented)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::WrongTokenType {
                expected: TokenKind::Refresh,
                found: claims.kind,
            });
        }
        let subject_id = claims.subject_id().ok_or(TokenError::MalformedToken)?;
        let identity = Identity {
            subject_id,
            display_name: claims.name,
        };

        // A concurrent refresh for the same subject holds the marker; losing
        // that race is not evidence of theft.
        let owner = nanoid!();
        let locked = self
            .store
            .try_lock_refresh(subject_id, &owner, self.config.refresh_lock_ttl)
            .await?;
        if !locked {
            debug!(%subject_id, "refresh already in flight");
            return Err(AuthError::RefreshConsumed);
        }

        let result = self.rotate(identity, presented).await;

        if let Err(e) = self.store.unlock_refresh(subject_id, &owner).await {
            warn!(%subject_id, "releasing refresh marker failed: {}", e);
        }
        result
    }

    async fn rotate(&self, identity: Identity, presented: &str) -> Result<AuthTokens, AuthError> {
        let subject_id = identity.subject_id;
        let minted: MintedPair = self.issuer.mint(&identity)?;

        let outcome = self
            .store
            .rotate_refresh(
                subject_id,
                presented,
                &minted.tokens.refresh_token.0,
                self.config.refresh_ttl,
            )
            .await?;

        match outcome {
            RotateOutcome::Rotated => {
                self.issuer.commit_session(&minted).await?;
                info!(%subject_id, "refresh token rotated");
                Ok(minted.tokens)
            }
            RotateOutcome::Missing => {
                debug!(%subject_id, "no refresh record");
                Err(AuthError::RefreshExpiredOrUnknown)
            }
            RotateOutcome::Mismatch => {
                warn!(%subject_id, "superseded refresh token presented, revoking sessions");
                if let Err(e) = self.revocation.revoke_all(subject_id).await {
                    error!(%subject_id, "revocation after replay failed: {}", e);
                }
                Err(AuthError::SecurityRevocation)
            }
        }
    }
}
