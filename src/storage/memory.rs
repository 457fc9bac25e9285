//! In-memory `SecretStore`. Not durable: all state is lost on process restart.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{SecretStore, StoreResult};
use crate::model::{Namespace, User};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn clear(&self) {
        self.users.write().clear();
        self.namespaces.write().clear();
    }
}

impl SecretStore for MemoryStore {
    fn init(&self) -> StoreResult<()> { Ok(()) }
    fn close(&self) -> StoreResult<()> { Ok(()) }

    fn set_user(&self, user: &User) -> StoreResult<()> {
        self.users.write().insert(user.name.clone(), user.clone());
        Ok(())
    }

    fn get_user(&self, name: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().get(name).cloned())
    }

    fn get_all_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().values().cloned().collect())
    }

    fn delete_user(&self, name: &str) -> StoreResult<()> {
        self.users.write().remove(name);
        Ok(())
    }

    fn set_namespace(&self, namespace: &Namespace) -> StoreResult<()> {
        self.namespaces.write().insert(namespace.name.clone(), namespace.clone());
        Ok(())
    }

    fn get_namespace(&self, name: &str) -> StoreResult<Option<Namespace>> {
        Ok(self.namespaces.read().get(name).cloned())
    }

    fn get_all_namespaces(&self) -> StoreResult<Vec<Namespace>> {
        Ok(self.namespaces.read().values().cloned().collect())
    }

    fn delete_namespace(&self, name: &str) -> StoreResult<()> {
        self.namespaces.write().remove(name);
        Ok(())
    }

    fn backend_name(&self) -> &'static str { "memory" }
}
