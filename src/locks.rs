//! In-process per-key mutexes.
//!
//! The `SecretStore` contract has no transactions, so every read-modify-write on a
//! single record (user or namespace) runs under the lock for that record's name. The
//! guarantee only holds among callers sharing the same `KeyLocks`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Prune idle entries once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self { Self::default() }

    /// Lock handle for `key`. Usage: `let lock = locks.for_key(k); let _guard = lock.lock();`
    pub fn for_key(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock();
        if table.len() >= PRUNE_THRESHOLD {
            // Only the table holds a reference to idle entries.
            table.retain(|_, l| Arc::strong_count(l) > 1);
        }
        table.entry(key.to_string()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize { self.table.lock().len() }
}
