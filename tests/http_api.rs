use serde_json::{Value, json};
use sessiond::api;
use sessiond::api::v1::ResponseCacheLayer;
use sessiond::application_impl::*;
use sessiond::application_port::AuthService;
use sessiond::domain_model::SubjectId;
use sessiond::domain_port::*;
use sessiond::infra_memory::*;
use sessiond::server::Server;
use std::sync::Arc;
use std::time::Duration;
use warp::http::{HeaderValue, Method, StatusCode};

struct TestApp {
    server: Arc<Server>,
    store: Arc<MemorySessionStore>,
    cache: Arc<MemoryResponseCache>,
}

fn app() -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemorySessionStore::new(clock.clone()));
    let cache = Arc::new(MemoryResponseCache::new(clock.clone()));
    let codec = Arc::new(
        JwtHs256Codec::try_new(
            JwtConfig {
                signing_key: b"http-api-test-signing-key-0123456789abcd".to_vec(),
            },
            clock.clone(),
        )
        .unwrap(),
    );
    let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
        Arc::new(FakeSubjectDirectory::new()),
        codec,
        store.clone(),
        clock,
        AuthConfig::default(),
    ));
    let server = Server::from_parts(
        auth_service,
        vec!["/api/v1/login".to_string(), "/api/v1/refresh".to_string()],
        ResponseCacheLayer::new(cache.clone(), Duration::from_secs(60), "cache"),
    );
    TestApp {
        server: Arc::new(server),
        store,
        cache,
    }
}

async fn send(app: &TestApp, request: warp::test::RequestBuilder) -> (StatusCode, Value) {
    let response = request.reply(&api::service(app.server.clone())).await;
    let body = serde_json::from_slice(response.body()).unwrap();
    (response.status(), body)
}

async fn login(app: &TestApp, username: &str) -> Value {
    let (status, body) = send(
        app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .json(&json!({ "username": username, "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().unwrap())
}

#[tokio::test]
async fn excluded_route_ignores_credentials() {
    let app = app();

    let (status, _) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .header("authorization", "Bearer garbage")
            .json(&json!({ "username": "u1", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app();

    let (status, body) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .json(&json!({ "username": "u1", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "InvalidCredentials");
}

#[tokio::test]
async fn protected_route_requires_bearer_token() {
    let app = app();

    let (status, body) = send(&app, warp::test::request().path("/api/v1/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MissingCredential");
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", "Basic dTE6cHc="),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MissingCredential");

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", "Bearer not.a.token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "InvalidToken");
}

#[tokio::test]
async fn me_returns_identity_and_is_cached() {
    let app = app();
    let tokens = login(&app, "u1").await;
    let authorization = bearer(&tokens["access_token"]);

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", &authorization),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["subject_id"],
        SubjectId::from_name("u1").to_string()
    );
    assert_eq!(body["data"]["display_name"], "u1");

    let key = app
        .server
        .response_cache
        .key(&Method::GET, "/api/v1/me", Some(&authorization));
    let cached = app.cache.get(&key).await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<Value>(&cached).unwrap(), body);
}

#[tokio::test]
async fn cached_response_is_not_served_after_logout() {
    let app = app();
    let tokens = login(&app, "u1").await;
    let authorization = bearer(&tokens["access_token"]);
    let me = || {
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", &authorization)
    };

    let (status, _) = send(&app, me()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/logout")
            .header("authorization", &authorization),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], true);

    let (status, body) = send(&app, me()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SessionExpired");
}

#[tokio::test]
async fn session_reports_store_metadata() {
    let app = app();
    let tokens = login(&app, "u1").await;

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/session")
            .header("authorization", bearer(&tokens["access_token"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["display_name"], "u1");
    assert_eq!(body["data"]["login_time"], body["data"]["last_active_time"]);
}

#[tokio::test]
async fn refresh_then_replay_over_http() {
    let app = app();
    let tokens = login(&app, "u1").await;
    let refresh = |token: &Value| {
        warp::test::request()
            .method("POST")
            .path("/api/v1/refresh")
            .json(&json!({ "refresh_token": token }))
    };

    let (status, body) = send(&app, refresh(&tokens["refresh_token"])).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"].clone();
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

    let (status, body) = send(&app, refresh(&tokens["refresh_token"])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SecurityRevocation");

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", bearer(&rotated["access_token"])),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SessionExpired");
}

#[tokio::test]
async fn concurrent_refresh_loser_gets_conflict() {
    let app = app();
    let tokens = login(&app, "u1").await;

    app.store
        .try_lock_refresh(
            SubjectId::from_name("u1"),
            "in-flight",
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/refresh")
            .json(&json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "RefreshConsumed");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app();

    let (status, body) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .header("content-type", "application/json")
            .body("{\"username\":"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BadRequest");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app();

    let (status, body) = send(&app, warp::test::request().path("/api/v1/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NotFound");
}

#[tokio::test]
async fn wrong_method_is_method_not_allowed() {
    let app = app();

    let (status, body) = send(&app, warp::test::request().path("/api/v1/login")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "MethodNotAllowed");
}

#[tokio::test]
async fn non_ascii_authorization_is_malformed_credential() {
    let app = app();
    let header = HeaderValue::from_bytes(b"Bearer \xe9abc").unwrap();

    let (status, body) = send(
        &app,
        warp::test::request()
            .path("/api/v1/me")
            .header("authorization", header.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MissingCredential");

    // excluded routes never look at the header
    let (status, _) = send(
        &app,
        warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .header("authorization", header)
            .json(&json!({ "username": "u1", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
