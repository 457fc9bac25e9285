//!
//! streamgate HTTP server
//! ----------------------
//! Axum router exposing the webhook the media gateway calls before every publish or
//! read, plus the dashboard endpoints operators use to manage users and namespaces.
//!
//! Responsibilities:
//! - `POST /api/auth`: webhook decision. 200 allow, 401 deny, 400 undecodable body,
//!   500 internal failure. Bodies are empty so the deny reason never leaks.
//! - Cookie sessions for the dashboard (`session_id` + `username`), backed by the
//!   identity directory.
//! - Admin endpoints, gated on an authenticated admin session.
//!
//! Directory calls hash passwords and touch storage, so they run on the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, DirectoryError, DirectoryResult};
use crate::identity::{session, DirectoryConfig, IdentityDirectory};
use crate::model::User;
use crate::namespaces::NamespaceDirectory;
use crate::storage::SharedStore;
use crate::validator::{Decision, RequestValidator, WebhookRequest};

pub mod admin;

pub const SESSION_COOKIE: &str = "session_id";
pub const USERNAME_COOKIE: &str = "username";

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<IdentityDirectory>,
    pub namespaces: Arc<NamespaceDirectory>,
    pub validator: RequestValidator,
    pub backend: &'static str,
}

impl AppState {
    /// Build both directories and the validator over one store.
    pub fn new(store: SharedStore, config: DirectoryConfig) -> Self {
        let backend = store.backend_name();
        let users = Arc::new(IdentityDirectory::new(store.clone(), config));
        let namespaces = Arc::new(NamespaceDirectory::new(store));
        let validator = RequestValidator::new(users.clone(), namespaces.clone());
        Self { users, namespaces, validator, backend }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth", post(webhook))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/account", get(account))
        .route("/account/password", post(change_own_password))
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/admin/users/{name}", delete(admin::delete_user))
        .route("/admin/users/{name}/reset-password", post(admin::reset_password))
        .route("/admin/users/{name}/reset-stream-key", post(admin::reset_stream_key))
        .route("/admin/namespaces", get(admin::list_namespaces).post(admin::create_namespace))
        .route("/admin/namespaces/{name}", delete(admin::delete_namespace))
        .route("/admin/namespaces/{name}/sessions", post(admin::add_session))
        .route("/admin/namespaces/{name}/sessions/{key}", delete(admin::remove_session))
        .with_state(state)
}

/// Run a directory call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> DirectoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res.map_err(AppError::from),
        Err(e) => {
            error!(target: "streamgate::server", error = %e, "blocking task failed");
            Err(AppError::internal("internal", "internal server error"))
        }
    }
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "store": state.backend}))
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let req: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(target: "streamgate::webhook", error = %e, "undecodable webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };
    let validator = state.validator.clone();
    match tokio::task::spawn_blocking(move || validator.validate_request(&req)).await {
        Ok(Ok(Decision::Allow)) => StatusCode::OK,
        Ok(Ok(Decision::Deny(_))) => StatusCode::UNAUTHORIZED,
        // already logged by the validator
        Ok(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Err(e) => {
            error!(target: "streamgate::webhook", error = %e, "validation task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name {
                    return urlencoding::decode(v).ok().map(|c| c.into_owned());
                }
            }
        }
    }
    None
}

fn cookie(name: &str, value: &str, max_age: i64) -> AppResult<HeaderValue> {
    let raw = format!("{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}", name, urlencoding::encode(value), max_age);
    HeaderValue::from_str(&raw).map_err(|_| AppError::internal("internal", "internal server error"))
}

fn session_cookies(user: &User, max_age: i64) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie(SESSION_COOKIE, &session::cookie_value(&user.session), max_age)?);
    headers.append(header::SET_COOKIE, cookie(USERNAME_COOKIE, &user.name, max_age)?);
    Ok(headers)
}

fn cleared_cookies() -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie(SESSION_COOKIE, "", 0)?);
    headers.append(header::SET_COOKIE, cookie(USERNAME_COOKIE, "", 0)?);
    Ok(headers)
}

/// Resolve the dashboard user from the session cookies.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let (Some(name), Some(sid)) = (parse_cookie(headers, USERNAME_COOKIE), parse_cookie(headers, SESSION_COOKIE)) else {
        return Err(AppError::unauthorized());
    };
    let users = state.users.clone();
    let found = blocking(move || match users.verify_session(&name, &sid) {
        Ok(true) => users.get(&name).map(Some),
        Ok(false) | Err(DirectoryError::UserNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    })
    .await?;
    found.ok_or_else(AppError::unauthorized)
}

pub(crate) async fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let user = authenticate(state, headers).await?;
    if !user.is_admin {
        warn!(target: "streamgate::server", user = %user.name, "admin endpoint refused");
        return Err(AppError::forbidden("forbidden", "admin privileges required"));
    }
    Ok(user)
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    status: &'static str,
    is_admin: bool,
    password_generated: bool,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    let users = state.users.clone();
    let ttl = users.config().session_ttl.num_seconds();
    let LoginPayload { username, password } = payload;
    let user = blocking(move || match users.login(&username, &password) {
        Ok(u) => Ok(Some(u)),
        Err(DirectoryError::UserNotFound(_)) | Err(DirectoryError::WrongPassword) => Ok(None),
        Err(e) => Err(e),
    })
    .await?;
    let Some(user) = user else {
        return Err(AppError::unauthorized());
    };
    let headers = session_cookies(&user, ttl)?;
    let body = LoginResponse { status: "ok", is_admin: user.is_admin, password_generated: user.password.is_generated };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let user = authenticate(&state, &headers).await?;
    let users = state.users.clone();
    blocking(move || users.logout(&user.name)).await?;
    Ok((StatusCode::OK, cleared_cookies()?, Json(serde_json::json!({"status": "ok"}))).into_response())
}

/// What a signed-in user sees about their own account.
#[derive(Debug, Serialize)]
struct AccountView {
    name: String,
    is_admin: bool,
    namespace: Option<String>,
    stream_key: String,
    password_generated: bool,
    session_expires: Option<chrono::DateTime<Utc>>,
}

async fn account(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<AccountView>> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(AccountView {
        name: user.name,
        is_admin: user.is_admin,
        namespace: user.namespace,
        stream_key: user.stream_key,
        password_generated: user.password.is_generated,
        session_expires: user.session.expiration,
    }))
}

#[derive(Debug, Deserialize)]
struct PasswordPayload {
    password: String,
}

async fn change_own_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PasswordPayload>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let user = authenticate(&state, &headers).await?;
    let Json(payload) = payload?;
    let users = state.users.clone();
    let name = user.name.clone();
    blocking(move || users.change_password(&name, &payload.password)).await?;
    info!(target: "streamgate::server", user = %user.name, "password changed from dashboard");
    Ok(Json(serde_json::json!({"status": "ok"})))
}
