//! Webhook decision engine.
//!
//! The media gateway asks, for every publish, read, or other stream action, whether the
//! caller may proceed. Every check fails closed; only publish also needs the stream key. Business-rule failures become `Decision::Deny`
//! with a reason that is only ever logged; storage or hashing failures are returned as
//! `Err` so the HTTP layer can answer 500 instead of 401.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::IdentityDirectory;
use crate::namespaces::NamespaceDirectory;
use crate::secrets::constant_time_eq;

/// Webhook payload sent by the gateway. Only `path`, `query`, and `action` take part
/// in the decision; the rest is accepted so the body decodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebhookRequest {
    pub ip: String,
    pub token: String,
    pub user: String,
    pub password: String,
    pub path: String,
    pub protocol: String,
    pub id: String,
    pub action: String,
    pub query: String,
}

/// Only `publish` is checked against the stream key. Every other action the gateway
/// sends (`read`, `playback`, `api`, `metrics`, ...) needs a resolvable namespace and
/// user, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Publish,
    Read,
    Other,
}

impl Action {
    pub fn parse(s: &str) -> Action {
        match s {
            "publish" => Action::Publish,
            "read" => Action::Read,
            _ => Action::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MalformedPath,
    MalformedQuery,
    MissingKey,
    NamespaceNotFound,
    UserNotFound,
    NamespaceMismatch,
    StreamKeyMismatch,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::MalformedPath => "malformed path",
            DenyReason::MalformedQuery => "malformed query",
            DenyReason::MissingKey => "missing stream key",
            DenyReason::NamespaceNotFound => "namespace not found",
            DenyReason::UserNotFound => "user not found",
            DenyReason::NamespaceMismatch => "user not allowed in namespace",
            DenyReason::StreamKeyMismatch => "invalid stream key",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool { matches!(self, Decision::Allow) }
}

/// Split `"<namespace>/<user>"`, tolerating one leading '/'.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut parts = trimmed.split('/');
    let ns = parts.next()?;
    let user = parts.next()?;
    if parts.next().is_some() || ns.is_empty() || user.is_empty() {
        return None;
    }
    Some((ns, user))
}

/// Percent-decode one form component to raw bytes. Escapes must be well formed; the
/// decoded bytes need not be UTF-8.
fn decode_component(raw: &str) -> Option<Vec<u8>> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    let spaced = raw.replace('+', " ");
    Some(urlencoding::decode_binary(spaced.as_bytes()).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedQuery;

/// Form-decode `query` and return the first `key` value.
pub fn stream_key_param(query: &str) -> Result<Option<String>, MalformedQuery> {
    let mut found = None;
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        if pair.contains(';') {
            return Err(MalformedQuery);
        }
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        let k = decode_component(k).ok_or(MalformedQuery)?;
        let v = decode_component(v).ok_or(MalformedQuery)?;
        if k == b"key" && found.is_none() {
            found = Some(String::from_utf8(v).map_err(|_| MalformedQuery)?);
        }
    }
    Ok(found)
}

#[derive(Clone)]
pub struct RequestValidator {
    users: Arc<IdentityDirectory>,
    namespaces: Arc<NamespaceDirectory>,
}

impl RequestValidator {
    pub fn new(users: Arc<IdentityDirectory>, namespaces: Arc<NamespaceDirectory>) -> Self {
        Self { users, namespaces }
    }

    /// Decide a single webhook call. Only internal failures are returned as `Err`.
    pub fn validate(&self, path: &str, query: &str, action: &str) -> DirectoryResult<Decision> {
        let decision = self.decide(path, query, action);
        match &decision {
            Ok(Decision::Allow) => {
                info!(target: "streamgate::webhook", path = %path, action = %action, "allowed")
            }
            Ok(Decision::Deny(reason)) => {
                info!(target: "streamgate::webhook", path = %path, action = %action, reason = %reason, "denied")
            }
            Err(e) => error!(target: "streamgate::webhook", path = %path, action = %action, error = %e, "validation failed"),
        }
        decision
    }

    pub fn validate_request(&self, req: &WebhookRequest) -> DirectoryResult<Decision> {
        self.validate(&req.path, &req.query, &req.action)
    }

    fn decide(&self, path: &str, query: &str, action: &str) -> DirectoryResult<Decision> {
        let Some((ns_name, user_name)) = split_path(path) else {
            return Ok(Decision::Deny(DenyReason::MalformedPath));
        };
        let Ok(key) = stream_key_param(query) else {
            return Ok(Decision::Deny(DenyReason::MalformedQuery));
        };
        let action = Action::parse(action);
        if action == Action::Publish && key.is_none() {
            return Ok(Decision::Deny(DenyReason::MissingKey));
        }

        match self.namespaces.get(ns_name) {
            Ok(_) => {}
            Err(DirectoryError::NamespaceNotFound(_)) => return Ok(Decision::Deny(DenyReason::NamespaceNotFound)),
            Err(e) => return Err(e),
        }
        let user = match self.users.get(user_name) {
            Ok(u) => u,
            Err(DirectoryError::UserNotFound(_)) => return Ok(Decision::Deny(DenyReason::UserNotFound)),
            Err(e) => return Err(e),
        };

        if !user.allowed_in(ns_name) {
            return Ok(Decision::Deny(DenyReason::NamespaceMismatch));
        }
        if action == Action::Publish {
            let key = key.unwrap_or_default();
            if user.stream_key.is_empty() || !constant_time_eq(key.as_bytes(), user.stream_key.as_bytes()) {
                return Ok(Decision::Deny(DenyReason::StreamKeyMismatch));
            }
        }
        Ok(Decision::Allow)
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
