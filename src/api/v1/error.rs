use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, status) = if let Some(code) = err.find::<ApiErrorCode>() {
        (*code, code.status())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, StatusCode::NOT_FOUND)
    } else if err.find::<warp::body::BodyDeserializeError>().is_some() {
        (ApiErrorCode::BadRequest, StatusCode::BAD_REQUEST)
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED)
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR)
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, code.to_string()));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

/// Client-facing error codes. Messages stay coarse; the precise reason is
/// only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Missing or malformed credential")]
    MissingCredential,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Session has expired, please log in again")]
    SessionExpired,
    #[error("Session could not be verified")]
    SessionUnverified,
    #[error("Refresh token is not valid, please log in again")]
    RefreshRejected,
    #[error("Refresh token already used")]
    RefreshConsumed,
    #[error("Credentials revoked for security reasons, please log in again")]
    SecurityRevocation,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Bad request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    /// Map a rejection raised while admitting a request. The gate fails
    /// closed, so an unreachable store reads as unauthorized.
    pub fn unauthorized(error: AuthError) -> ApiErrorCode {
        match error {
            AuthError::StoreUnavailable(e) => {
                warn!("session store unavailable during validation: {}", e);
                ApiErrorCode::SessionUnverified
            }
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::MissingCredential
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::SessionExpired
            | ApiErrorCode::SessionUnverified
            | ApiErrorCode::RefreshRejected
            | ApiErrorCode::SecurityRevocation
            | ApiErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiErrorCode::RefreshConsumed => StatusCode::CONFLICT,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MalformedCredential => ApiErrorCode::MissingCredential,
            AuthError::Token(_) | AuthError::WrongTokenType { .. } => ApiErrorCode::InvalidToken,
            AuthError::SessionNotFound => ApiErrorCode::SessionExpired,
            AuthError::RefreshExpiredOrUnknown => ApiErrorCode::RefreshRejected,
            AuthError::RefreshConsumed => ApiErrorCode::RefreshConsumed,
            AuthError::SecurityRevocation => ApiErrorCode::SecurityRevocation,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::StoreUnavailable(e) => {
                warn!("session store unavailable: {}", e);
                ApiErrorCode::ServiceUnavailable
            }
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
