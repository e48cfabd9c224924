use crate::application_port::{AuthError, TokenCodec, TokenError};
use crate::domain_model::Claims;
use crate::domain_port::Clock;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use std::sync::Arc;

pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct JwtConfig {
    pub signing_key: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

pub struct JwtHs256Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Codec {
    pub fn try_new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        if cfg.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(AuthError::InternalError(format!(
                "signing key must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the injected clock in `verify`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|s| s.to_string()).collect();

        Ok(JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
            clock,
        })
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// The `alg` named in the token header, read without going through
/// jsonwebtoken, whose `Algorithm` cannot represent `none`.
fn header_alg(token: &str) -> Option<String> {
    let (header, _) = token.split_once('.')?;
    let json = URL_SAFE_NO_PAD.decode(header).ok()?;
    serde_json::from_slice::<RawHeader>(&json).ok().map(|h| h.alg)
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::MalformedToken,
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if header_alg(token).is_some_and(|alg| alg != "HS256") {
            return Err(TokenError::UnsupportedAlgorithm);
        }
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(classify)?;
        if self.clock.now().timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}
