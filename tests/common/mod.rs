#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use streamgate::server::{build_router, AppState};
use streamgate::storage::{MemoryStore, SecretStore};
use streamgate::DirectoryConfig;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), DirectoryConfig::default());
        let router = build_router(state.clone());
        Self { store, state, router }
    }

    /// Namespace "ns" with user "alice" (stream key "abc") plus an admin "root".
    pub fn seeded() -> Self {
        let app = Self::new();
        app.state.namespaces.create("ns").expect("namespace");
        let mut alice = app.state.users.create("alice", "password1", false, None).expect("alice");
        alice.stream_key = "abc".into();
        app.store.set_user(&alice).expect("set alice");
        app.state.users.create("root", "rootpassword", true, None).expect("root");
        app
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("response")
    }

    /// Log in and return a `Cookie` header value for the new session.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self.send(json_request("POST", "/login", serde_json::json!({"username": username, "password": password}))).await;
        assert_eq!(resp.status(), 200, "login as {}", username);
        cookie_header(&resp)
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// A request whose body is sent as-is, for bodies `json_request` cannot express.
pub fn raw_request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn with_cookie(mut req: Request<Body>, cookie: &str) -> Request<Body> {
    req.headers_mut().insert(header::COOKIE, cookie.parse().expect("cookie header"));
    req
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
}

/// Collapse the response's `Set-Cookie` headers into a request `Cookie` value.
pub fn cookie_header(resp: &Response<Body>) -> String {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn read_body(resp: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.expect("body").to_vec()
}

pub async fn read_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&read_body(resp).await).expect("json body")
}
