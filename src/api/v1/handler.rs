use super::cache::ResponseCacheLayer;
use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let tokens = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

pub async fn logout(
    identity: Identity,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .revoke_all(identity.subject_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse { revoked: true })))
}

/// Caller identity. Cached per credential, so it must not carry anything
/// that changes while the token stays the same.
pub async fn me(
    identity: Identity,
    cache_key: String,
    cache: Arc<ResponseCacheLayer>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(body) = cache.lookup(&cache_key).await {
        return Ok(json_body(body));
    }

    let body = serde_json::to_string(&ApiResponse::ok(identity))
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;
    cache.store(&cache_key, &body).await;

    Ok(json_body(body))
}

pub async fn session(
    identity: Identity,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let record = auth_service
        .session(identity.subject_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?
        .ok_or_else(|| reject::custom(ApiErrorCode::SessionExpired))?;

    Ok(warp::reply::json(&ApiResponse::ok(record)))
}

fn json_body(body: String) -> impl warp::Reply {
    warp::reply::with_header(body, "content-type", "application/json")
}
