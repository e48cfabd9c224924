use super::cache::request_key;
use super::gate::{authenticated, public};
use super::handler;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // path before method: an unknown path must reject as not found
    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(public(server.gate.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path("refresh")
        .and(warp::path::end())
        .and(warp::post())
        .and(public(server.gate.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(server.gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::path("me")
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(server.gate.clone()))
        .and(request_key(server.response_cache.clone()))
        .and(with(server.response_cache.clone()))
        .and_then(handler::me);

    let session = warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(server.gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::session);

    login.or(refresh).or(logout).or(me).or(session)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
