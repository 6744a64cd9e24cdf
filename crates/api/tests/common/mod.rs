#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use workhub_api::auth::jwt::{JwtConfig, TokenAuthority};
use workhub_api::auth::password::hash_password;
use workhub_api::config::ServerConfig;
use workhub_api::routes;
use workhub_api::session::{MemorySessionCache, SessionCache, SessionStore};
use workhub_api::state::AppState;
use workhub_core::types::DbId;
use workhub_db::models::role::CreateRole;
use workhub_db::models::user::{CreateUser, User};
use workhub_db::repositories::{PermissionRepo, RbacRepo, RoleRepo, UserRepo};

pub const PRIVATE_KEY: &str = include_str!("../fixtures/jwt_primary_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/jwt_primary_public.pem");

/// Password given to every user created by [`create_user`].
pub const PASSWORD: &str = "s3cret-pass";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        private_key_pem: PRIVATE_KEY.as_bytes().to_vec(),
        public_key_pem: PUBLIC_KEY.as_bytes().to_vec(),
        issuer: "workhub-test".to_string(),
        access_token_expiry_secs: 3600,
        refresh_token_expiry_secs: 7 * 24 * 3600,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: String::new(),
        redis_url: None,
        cache_op_timeout_ms: 250,
        password_min_length: 6,
        jwt: test_jwt_config(),
    }
}

/// Application state over `pool` with the given session cache.
pub fn test_state(pool: PgPool, cache: Option<Arc<dyn SessionCache>>) -> AppState {
    let config = test_config();
    let tokens = Arc::new(TokenAuthority::new(&config.jwt).expect("fixture keys should parse"));
    let sessions = SessionStore::new(
        pool.clone(),
        cache,
        Duration::from_millis(config.cache_op_timeout_ms),
    );
    AppState {
        pool,
        config: Arc::new(config),
        tokens,
        sessions,
    }
}

/// Build the full application router with all middleware layers and an
/// in-memory session cache.
pub fn build_test_app(pool: PgPool) -> Router {
    let cache: Arc<dyn SessionCache> = Arc::new(MemorySessionCache::new());
    build_test_app_with_state(test_state(pool, Some(cache)))
}

/// Build the full application router around an existing state.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn delete_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), Some(body)).await
}

/// Send a request with an arbitrary `Authorization` header value.
pub async fn get_with_authorization(app: Router, uri: &str, authorization: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Data helpers
// ---------------------------------------------------------------------------

/// Insert a user whose password is [`PASSWORD`].
pub async fn create_user(pool: &PgPool, username: &str) -> User {
    let input = CreateUser {
        email: format!("{username}@test.com"),
        username: username.to_string(),
        password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Log in through the API and return the response body.
pub async fn login(app: Router, email: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Create a user and return it with a fresh access token.
pub async fn user_with_token(pool: &PgPool, app: Router, username: &str) -> (User, String) {
    let user = create_user(pool, username).await;
    let json = login(app, &user.email, PASSWORD).await;
    let token = json["access_token"].as_str().unwrap().to_string();
    (user, token)
}

/// Id of the permission with `code` (seeded codes included).
pub async fn permission_id(pool: &PgPool, code: &str) -> DbId {
    PermissionRepo::find_by_code(pool, code)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("permission {code} should exist"))
        .id
}

/// Create a role granting `codes` and give it to `user_id`. Returns the role id.
pub async fn grant(pool: &PgPool, user_id: DbId, role_code: &str, codes: &[&str]) -> DbId {
    let role = RoleRepo::create(
        pool,
        &CreateRole {
            name: format!("Role {role_code}"),
            code: role_code.to_string(),
            description: None,
            is_active: None,
        },
    )
    .await
    .unwrap();

    let mut ids = Vec::new();
    for code in codes {
        ids.push(permission_id(pool, code).await);
    }
    RbacRepo::assign_permissions_to_role(pool, role.id, &ids)
        .await
        .unwrap();
    RbacRepo::assign_roles_to_user(pool, user_id, &[role.id])
        .await
        .unwrap();
    role.id
}

/// Give `user_id` the seeded `super_admin` role.
pub async fn make_super_admin(pool: &PgPool, user_id: DbId) {
    let role = RoleRepo::find_by_code(pool, workhub_core::permissions::SUPER_ADMIN_ROLE_CODE)
        .await
        .unwrap()
        .expect("super_admin role is seeded");
    RbacRepo::assign_roles_to_user(pool, user_id, &[role.id])
        .await
        .unwrap();
}
