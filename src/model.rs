//! Records persisted by the `SecretStore`: users, namespaces, and namespace sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPassword {
    /// Encoded hash string produced by `passwords::hash`.
    pub hash: String,
    /// True while the password is one the system generated (bootstrap or reset).
    pub is_generated: bool,
}

/// Dashboard login state. The zero value means "not logged in".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSession {
    pub id: u64,
    pub expiration: Option<DateTime<Utc>>,
}

impl UserSession {
    pub fn is_empty(&self) -> bool { self.id == 0 || self.expiration.is_none() }

    /// Valid only while the expiration lies strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(exp) if self.id != 0 => exp > now,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub stream_key: String,
    pub is_admin: bool,
    pub password: UserPassword,
    pub session: UserSession,
    /// When set, the user may only be addressed through this namespace.
    pub namespace: Option<String>,
}

impl User {
    /// True when `namespace` is acceptable for this user: unscoped users match any namespace.
    pub fn allowed_in(&self, namespace: &str) -> bool {
        match self.namespace.as_deref() {
            None | Some("") => true,
            Some(pinned) => pinned == namespace,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceSession {
    pub key: String,
    pub name: String,
    pub user: String,
    pub created: DateTime<Utc>,
    pub last_published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub sessions: Vec<NamespaceSession>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), sessions: Vec::new() } }

    pub fn session(&self, key: &str) -> Option<&NamespaceSession> {
        self.sessions.iter().find(|s| s.key == key)
    }
}
