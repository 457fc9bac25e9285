//! Namespace directory: namespace lifecycle and dashboard-session bookkeeping.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{DirectoryError, DirectoryResult, ValidationError};
use crate::locks::KeyLocks;
use crate::model::{Namespace, NamespaceSession};
use crate::secrets::random_text;
use crate::storage::SharedStore;

/// Namespace names form the first segment of a webhook path.
fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.contains('/') {
        return Err(ValidationError::NamespaceName);
    }
    Ok(())
}

pub struct NamespaceDirectory {
    store: SharedStore,
    locks: KeyLocks,
}

impl NamespaceDirectory {
    pub fn new(store: SharedStore) -> Self {
        Self { store, locks: KeyLocks::new() }
    }

    fn load(&self, name: &str) -> DirectoryResult<Namespace> {
        self.store.get_namespace(name)?.ok_or_else(|| DirectoryError::NamespaceNotFound(name.to_string()))
    }

    pub fn create(&self, name: &str) -> DirectoryResult<Namespace> {
        validate_name(name)?;
        let lock = self.locks.for_key(name);
        let _guard = lock.lock();
        if self.store.get_namespace(name)?.is_some() {
            return Err(DirectoryError::NamespaceAlreadyExists(name.to_string()));
        }
        let ns = Namespace::new(name);
        self.store.set_namespace(&ns)?;
        info!(target: "streamgate::namespaces", namespace = %name, "namespace created");
        Ok(ns)
    }

    pub fn get(&self, name: &str) -> DirectoryResult<Namespace> { self.load(name) }

    pub fn delete(&self, name: &str) -> DirectoryResult<()> {
        let lock = self.locks.for_key(name);
        let _guard = lock.lock();
        self.store.delete_namespace(name)?;
        info!(target: "streamgate::namespaces", namespace = %name, "namespace deleted");
        Ok(())
    }

    pub fn get_all_namespaces(&self) -> DirectoryResult<Vec<Namespace>> { Ok(self.store.get_all_namespaces()?) }

    /// Append a session with a fresh key. The key is unique within the namespace.
    pub fn add_session(&self, namespace: &str, label: &str, user: &str) -> DirectoryResult<NamespaceSession> {
        let lock = self.locks.for_key(namespace);
        let _guard = lock.lock();
        let mut ns = self.load(namespace)?;
        let mut key = random_text()?;
        while ns.session(&key).is_some() {
            key = random_text()?;
        }
        let session = NamespaceSession {
            key,
            name: label.to_string(),
            user: user.to_string(),
            created: Utc::now(),
            last_published: None,
        };
        ns.sessions.push(session.clone());
        self.store.set_namespace(&ns)?;
        debug!(target: "streamgate::namespaces", namespace = %namespace, label = %label, user = %user, "session added");
        Ok(session)
    }

    /// Drop every session with `key`. An unknown key leaves the namespace unchanged.
    pub fn remove_session(&self, namespace: &str, key: &str) -> DirectoryResult<()> {
        let lock = self.locks.for_key(namespace);
        let _guard = lock.lock();
        let mut ns = self.load(namespace)?;
        let before = ns.sessions.len();
        ns.sessions.retain(|s| s.key != key);
        if ns.sessions.len() == before {
            return Ok(());
        }
        self.store.set_namespace(&ns)?;
        debug!(target: "streamgate::namespaces", namespace = %namespace, "session removed");
        Ok(())
    }
}
