use super::{AuthConfig, StoreWritePolicy};
use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::*;
use crate::domain_port::{Clock, SessionStore, SessionStoreError};
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A freshly signed pair that has not been recorded in the store yet.
#[derive(Debug, Clone)]
pub struct MintedPair {
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
    pub tokens: AuthTokens,
}

pub struct TokenIssuer {
    codec: Arc<dyn TokenCodec>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl TokenIssuer {
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

    pub fn mint(&self, identity: &Identity) -> Result<MintedPair, AuthError> {
        let issued_at = self.clock.now_seconds();
        let access_exp = issued_at + self.config.access_ttl;
        let refresh_exp = issued_at + self.config.refresh_ttl;

        let access = Claims::new(identity, TokenKind::Access, issued_at, access_exp);
        let refresh = Claims::new(identity, TokenKind::Refresh, issued_at, refresh_exp);

        Ok(MintedPair {
            identity: identity.clone(),
            issued_at,
            tokens: AuthTokens {
                access_token: AccessToken(self.codec.sign(&access)?),
                refresh_token: RefreshToken(self.codec.sign(&refresh)?),
                access_token_expires_at: access_exp,
                refresh_token_expires_at: refresh_exp,
            },
        })
    }

    /// Mint a pair and record both the session and the refresh record.
    pub async fn issue_pair(&self, identity: Identity) -> Result<AuthTokens, AuthError> {
        let minted = self.mint(&identity)?;
        let subject_id = identity.subject_id;

        let written = self.write_records(&minted).await;
        self.settle(subject_id, written).await?;

        info!(%subject_id, "session issued");
        Ok(minted.tokens)
    }

    /// Record the session half of a pair whose refresh record was already
    /// written by a rotation.
    pub async fn commit_session(&self, minted: &MintedPair) -> Result<(), AuthError> {
        let record = self.session_record(minted);
        let written = self.store.put_session(&record, self.config.access_ttl).await;
        self.settle(minted.identity.subject_id, written).await
    }

    fn session_record(&self, minted: &MintedPair) -> SessionRecord {
        SessionRecord::started(
            minted.identity.subject_id,
            minted.identity.display_name.clone(),
            minted.issued_at,
        )
    }

    async fn write_records(&self, minted: &MintedPair) -> Result<(), SessionStoreError> {
        let subject_id = minted.identity.subject_id;
        self.store
            .put_session(&self.session_record(minted), self.config.access_ttl)
            .await?;
        self.store
            .put_refresh(
                subject_id,
                &minted.tokens.refresh_token.0,
                self.config.refresh_ttl,
            )
            .await?;
        Ok(())
    }

    async fn settle(
        &self,
        subject_id: SubjectId,
        written: Result<(), SessionStoreError>,
    ) -> Result<(), AuthError> {
        let Err(e) = written else {
            return Ok(());
        };
        match self.config.store_write_policy {
            StoreWritePolicy::FailClosed => {
                error!(%subject_id, "recording session failed: {}", e);
                // keep session and refresh records all-or-nothing
                if let Err(rollback) = self.store.revoke(subject_id).await {
                    warn!(%subject_id, "rolling back partial session failed: {}", rollback);
                }
                Err(e.into())
            }
            StoreWritePolicy::Degrade => {
                warn!(%subject_id, "recording session failed, issuing anyway: {}", e);
                Ok(())
            }
        }
    }
}
