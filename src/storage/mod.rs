//!
//! streamgate storage module
//! -------------------------
//! The `SecretStore` trait is the only contract the directories have with persistence:
//! typed get/set/delete accessors for `User` and `Namespace` records, each keyed by its
//! unique name. A missing key is `Ok(None)`, never an error; the directories translate
//! absence into their own not-found errors.
//!
//! Two implementations ship with the crate:
//! - `MemoryStore`: process-local maps, used by tests and `--memory` deployments.
//! - `FileStore`: durable single-file snapshot store (bincode), rewritten atomically on
//!   every mutation.
//!
//! Stores do not serialize read-modify-write sequences; callers that need that (the
//! directories) hold a per-key lock around get + set.

use std::sync::Arc;
use thiserror::Error;

use crate::model::{Namespace, User};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("store is closed")]
    Closed,
    #[error("unsupported snapshot: {0}")]
    Unsupported(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait SecretStore: Send + Sync {
    fn init(&self) -> StoreResult<()>;
    fn close(&self) -> StoreResult<()>;

    fn set_user(&self, user: &User) -> StoreResult<()>;
    fn get_user(&self, name: &str) -> StoreResult<Option<User>>;
    fn get_all_users(&self) -> StoreResult<Vec<User>>;
    fn delete_user(&self, name: &str) -> StoreResult<()>;

    fn set_namespace(&self, namespace: &Namespace) -> StoreResult<()>;
    fn get_namespace(&self, name: &str) -> StoreResult<Option<Namespace>>;
    fn get_all_namespaces(&self) -> StoreResult<Vec<Namespace>>;
    fn delete_namespace(&self, name: &str) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn SecretStore>;

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
