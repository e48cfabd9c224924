use super::error::ApiErrorCode;
use crate::application_port::{AuthError, AuthService};
use crate::domain_model::Identity;
use crate::logger::*;
use std::collections::HashSet;
use std::sync::Arc;
use warp::filters::path::FullPath;
use warp::http::{HeaderMap, HeaderValue};
use warp::{Filter, http, reject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The path is on the exclusion list; no credential was looked at.
    Bypassed,
    Authenticated(Identity),
}

/// Boundary check run in front of every route.
pub struct RequestGate {
    excluded_paths: HashSet<String>,
    auth_service: Arc<dyn AuthService>,
}

impl RequestGate {
    pub fn new(
        excluded_paths: impl IntoIterator<Item = String>,
        auth_service: Arc<dyn AuthService>,
    ) -> Self {
        Self {
            excluded_paths: excluded_paths.into_iter().collect(),
            auth_service,
        }
    }

    /// Exact match only, `/api/v1/login/x` is not excluded by `/api/v1/login`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.contains(path)
    }

    /// `authorization` is the raw header value. One that is not visible
    /// ASCII counts as malformed, never as absent.
    pub async fn admit(
        &self,
        path: &str,
        authorization: Option<&HeaderValue>,
    ) -> Result<GateOutcome, AuthError> {
        if self.is_excluded(path) {
            return Ok(GateOutcome::Bypassed);
        }
        let authorization = authorization
            .map(|value| value.to_str().map_err(|_| AuthError::MalformedCredential))
            .transpose()?;
        let token = bearer_token(authorization).ok_or(AuthError::MalformedCredential)?;
        let identity = self.auth_service.validate(token).await?;
        Ok(GateOutcome::Authenticated(identity))
    }
}

/// Extract `<token>` from `Bearer <token>`.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.split_once(' ')?;
    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}

pub fn gate(
    gate: Arc<RequestGate>,
) -> impl Filter<Extract = (GateOutcome,), Error = warp::Rejection> + Clone {
    warp::path::full()
        .and(warp::header::headers_cloned())
        .and_then(move |path: FullPath, headers: HeaderMap| {
            let gate = gate.clone();
            async move {
                gate.admit(path.as_str(), headers.get(http::header::AUTHORIZATION))
                    .await
                    .map_err(|e| {
                        debug!(path = path.as_str(), "request rejected: {}", e);
                        reject::custom(ApiErrorCode::unauthorized(e))
                    })
            }
        })
}

/// Gate for routes that need a caller identity.
pub fn authenticated(
    gate: Arc<RequestGate>,
) -> impl Filter<Extract = (Identity,), Error = warp::Rejection> + Clone {
    self::gate(gate).and_then(|outcome: GateOutcome| async move {
        match outcome {
            GateOutcome::Authenticated(identity) => Ok(identity),
            // an identity route was put on the exclusion list
            GateOutcome::Bypassed => Err(reject::custom(ApiErrorCode::MissingCredential)),
        }
    })
}

/// Gate for routes that do not consume the identity.
pub fn public(gate: Arc<RequestGate>) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    self::gate(gate).map(|_| ()).untuple_one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_port::{LoginInput, TokenError};
    use crate::domain_model::*;

    /// Accepts exactly the token `good`.
    struct OneTokenAuth;

    #[async_trait::async_trait]
    impl AuthService for OneTokenAuth {
        async fn login(&self, _: LoginInput) -> Result<AuthTokens, AuthError> {
            Err(AuthError::InvalidCredentials)
        }

        async fn validate(&self, access_token: &str) -> Result<Identity, AuthError> {
            if access_token != "good" {
                return Err(TokenError::InvalidSignature.into());
            }
            Ok(Identity {
                subject_id: SubjectId::from_name("u1"),
                display_name: None,
            })
        }

        async fn refresh(&self, _: &str) -> Result<AuthTokens, AuthError> {
            Err(AuthError::RefreshExpiredOrUnknown)
        }

        async fn revoke_all(&self, _: SubjectId) -> Result<(), AuthError> {
            Ok(())
        }

        async fn session(&self, _: SubjectId) -> Result<Option<SessionRecord>, AuthError> {
            Ok(None)
        }
    }

    fn login_excluded() -> RequestGate {
        RequestGate::new(vec!["/api/v1/login".to_string()], Arc::new(OneTokenAuth))
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn exclusion_is_exact_match() {
        let gate = login_excluded();
        assert!(gate.is_excluded("/api/v1/login"));
        assert!(!gate.is_excluded("/api/v1/login/"));
        assert!(!gate.is_excluded("/api/v1/login/x"));
        assert!(!gate.is_excluded("/api/v1"));
    }

    #[tokio::test]
    async fn excluded_path_bypasses_with_or_without_header() {
        let gate = login_excluded();
        let garbage = HeaderValue::from_static("Bearer garbage");
        let non_ascii = HeaderValue::from_bytes(b"Bearer \xe9abc").unwrap();

        for header in [None, Some(&garbage), Some(&non_ascii)] {
            assert_eq!(
                gate.admit("/api/v1/login", header).await.unwrap(),
                GateOutcome::Bypassed
            );
        }
    }

    #[tokio::test]
    async fn paths_under_an_excluded_path_are_gated() {
        let gate = login_excluded();
        for path in ["/api/v1/login/", "/api/v1/login/x"] {
            assert!(matches!(
                gate.admit(path, None).await,
                Err(AuthError::MalformedCredential)
            ));
        }

        let good = HeaderValue::from_static("Bearer good");
        assert!(matches!(
            gate.admit("/api/v1/login/x", Some(&good)).await,
            Ok(GateOutcome::Authenticated(_))
        ));
    }

    #[tokio::test]
    async fn non_ascii_header_is_malformed() {
        let gate = login_excluded();
        let header = HeaderValue::from_bytes(b"Bearer \xe9abc").unwrap();
        assert!(matches!(
            gate.admit("/api/v1/me", Some(&header)).await,
            Err(AuthError::MalformedCredential)
        ));
    }

    #[tokio::test]
    async fn bad_token_is_a_token_error() {
        let gate = login_excluded();
        let header = HeaderValue::from_static("Bearer forged");
        assert!(matches!(
            gate.admit("/api/v1/me", Some(&header)).await,
            Err(AuthError::Token(TokenError::InvalidSignature))
        ));
    }
}
