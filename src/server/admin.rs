//! Admin dashboard endpoints. Every handler starts with `require_admin`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{blocking, require_admin, AppState};
use crate::error::AppResult;
use crate::model::{Namespace, NamespaceSession, User};
use crate::secrets::random_text;

/// Listing entry. Hashes, stream keys, and session ids stay server-side.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub name: String,
    pub is_admin: bool,
    pub namespace: Option<String>,
    pub password_generated: bool,
    pub logged_in: bool,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            name: u.name.clone(),
            is_admin: u.is_admin,
            namespace: u.namespace.clone(),
            password_generated: u.password.is_generated,
            logged_in: u.session.is_live_at(Utc::now()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionView {
    pub key: String,
    pub name: String,
    pub user: String,
    pub created: DateTime<Utc>,
    pub last_published: Option<DateTime<Utc>>,
}

impl From<NamespaceSession> for SessionView {
    fn from(s: NamespaceSession) -> Self {
        Self { key: s.key, name: s.name, user: s.user, created: s.created, last_published: s.last_published }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceView {
    pub name: String,
    pub sessions: Vec<SessionView>,
}

impl From<Namespace> for NamespaceView {
    fn from(n: Namespace) -> Self {
        Self { name: n.name, sessions: n.sessions.into_iter().map(SessionView::from).collect() }
    }
}

pub async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<UserView>>> {
    require_admin(&state, &headers).await?;
    let users = state.users.clone();
    let mut all = blocking(move || users.get_all_users()).await?;
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(all.iter().map(UserView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub name: String,
    /// Generated when omitted; the generated value is returned once.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: UserView,
    pub stream_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreatedUser>)> {
    let admin = require_admin(&state, &headers).await?;
    let Json(payload) = payload?;
    let users = state.users.clone();
    let (user, generated) = blocking(move || {
        let (password, generated) = match payload.password {
            Some(p) => (p, None),
            None => {
                let p = random_text()?;
                (p.clone(), Some(p))
            }
        };
        let user = users.create(&payload.name, &password, payload.is_admin, payload.namespace.as_deref())?;
        Ok((user, generated))
    })
    .await?;
    info!(target: "streamgate::admin", admin = %admin.name, user = %user.name, "user created from dashboard");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUser { user: UserView::from(&user), stream_key: user.stream_key.clone(), password: generated }),
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    let admin = require_admin(&state, &headers).await?;
    let users = state.users.clone();
    let target = name.clone();
    blocking(move || users.delete(&target)).await?;
    info!(target: "streamgate::admin", admin = %admin.name, user = %name, "user deleted from dashboard");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&state, &headers).await?;
    let users = state.users.clone();
    let password = blocking(move || users.reset_password(&name)).await?;
    Ok(Json(serde_json::json!({"status": "ok", "password": password})))
}

pub async fn reset_stream_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&state, &headers).await?;
    let users = state.users.clone();
    let key = blocking(move || users.reset_stream_key(&name)).await?;
    Ok(Json(serde_json::json!({"status": "ok", "stream_key": key})))
}

pub async fn list_namespaces(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<NamespaceView>>> {
    require_admin(&state, &headers).await?;
    let namespaces = state.namespaces.clone();
    let mut all = blocking(move || namespaces.get_all_namespaces()).await?;
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(all.into_iter().map(NamespaceView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateNamespacePayload {
    pub name: String,
}

pub async fn create_namespace(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateNamespacePayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<NamespaceView>)> {
    require_admin(&state, &headers).await?;
    let Json(payload) = payload?;
    let namespaces = state.namespaces.clone();
    let ns = blocking(move || namespaces.create(&payload.name)).await?;
    Ok((StatusCode::CREATED, Json(NamespaceView::from(ns))))
}

pub async fn delete_namespace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    require_admin(&state, &headers).await?;
    let namespaces = state.namespaces.clone();
    blocking(move || namespaces.delete(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AddSessionPayload {
    pub name: String,
    pub user: String,
}

pub async fn add_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(namespace): Path<String>,
    payload: Result<Json<AddSessionPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    require_admin(&state, &headers).await?;
    let Json(payload) = payload?;
    let namespaces = state.namespaces.clone();
    let session = blocking(move || namespaces.add_session(&namespace, &payload.name, &payload.user)).await?;
    Ok((StatusCode::CREATED, Json(SessionView::from(session))))
}

pub async fn remove_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((namespace, key)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_admin(&state, &headers).await?;
    let namespaces = state.namespaces.clone();
    blocking(move || namespaces.remove_session(&namespace, &key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
