//! Durable single-file `SecretStore`.
//!
//! The whole directory (users + namespaces) is small, so it is kept in memory and the
//! snapshot file is rewritten on every mutation: serialize with bincode, write to
//! `<path>.tmp`, fsync, then rename over `<path>`. A crash mid-write leaves the
//! previous snapshot intact. If persisting fails the in-memory change is rolled back,
//! so memory never runs ahead of disk.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{SecretStore, StoreError, StoreResult};
use crate::model::{Namespace, User};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    users: Vec<User>,
    namespaces: Vec<Namespace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle { Pending, Open, Closed }

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    users: HashMap<String, User>,
    namespaces: HashMap<String, Namespace>,
}

impl State {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.lifecycle == Lifecycle::Open { Ok(()) } else { Err(StoreError::Closed) }
    }
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl FileStore {
    /// Create a handle for `path`. Nothing touches the disk until `init()`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: RwLock::new(State { lifecycle: Lifecycle::Pending, users: HashMap::new(), namespaces: HashMap::new() }),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load(&self) -> StoreResult<Option<Snapshot>> {
        if !self.path.exists() { return Ok(None); }
        let bytes = fs::read(&self.path)?;
        let snap: Snapshot = bincode::deserialize(&bytes)?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(StoreError::Unsupported(format!("version {} (expected {})", snap.version, SNAPSHOT_VERSION)));
        }
        Ok(Some(snap))
    }

    fn persist(&self, state: &State) -> StoreResult<()> {
        let snap = Snapshot {
            version: SNAPSHOT_VERSION,
            users: state.users.values().cloned().collect(),
            namespaces: state.namespaces.values().cloned().collect(),
        };
        let bytes = bincode::serialize(&snap)?;
        let tmp = self.tmp_path();
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(target: "streamgate::storage", path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// Apply `change` under the write lock and persist; undo it if persisting fails.
    fn mutate<U>(&self, change: impl FnOnce(&mut State) -> U, undo: impl FnOnce(&mut State, U)) -> StoreResult<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        let prev = change(&mut *state);
        if let Err(e) = self.persist(&*state) {
            undo(&mut *state, prev);
            return Err(e);
        }
        Ok(())
    }
}

impl SecretStore for FileStore {
    fn init(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.lifecycle == Lifecycle::Open { return Ok(()); }
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { fs::create_dir_all(dir)?; }
        }
        let snap = self.load()?;
        state.users.clear();
        state.namespaces.clear();
        if let Some(snap) = snap {
            state.users.extend(snap.users.into_iter().map(|u| (u.name.clone(), u)));
            state.namespaces.extend(snap.namespaces.into_iter().map(|n| (n.name.clone(), n)));
        }
        state.lifecycle = Lifecycle::Open;
        info!(
            target: "streamgate::storage",
            path = %self.path.display(), users = state.users.len(), namespaces = state.namespaces.len(),
            "file store opened"
        );
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        state.lifecycle = Lifecycle::Closed;
        state.users.clear();
        state.namespaces.clear();
        Ok(())
    }

    fn set_user(&self, user: &User) -> StoreResult<()> {
        self.mutate(
            |s| s.users.insert(user.name.clone(), user.clone()),
            |s, prev| match prev {
                Some(p) => { s.users.insert(p.name.clone(), p); }
                None => { s.users.remove(&user.name); }
            },
        )
    }

    fn get_user(&self, name: &str) -> StoreResult<Option<User>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.users.get(name).cloned())
    }

    fn get_all_users(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.users.values().cloned().collect())
    }

    fn delete_user(&self, name: &str) -> StoreResult<()> {
        self.mutate(
            |s| s.users.remove(name),
            |s, prev| { if let Some(p) = prev { s.users.insert(p.name.clone(), p); } },
        )
    }

    fn set_namespace(&self, namespace: &Namespace) -> StoreResult<()> {
        self.mutate(
            |s| s.namespaces.insert(namespace.name.clone(), namespace.clone()),
            |s, prev| match prev {
                Some(p) => { s.namespaces.insert(p.name.clone(), p); }
                None => { s.namespaces.remove(&namespace.name); }
            },
        )
    }

    fn get_namespace(&self, name: &str) -> StoreResult<Option<Namespace>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.namespaces.get(name).cloned())
    }

    fn get_all_namespaces(&self) -> StoreResult<Vec<Namespace>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.namespaces.values().cloned().collect())
    }

    fn delete_namespace(&self, name: &str) -> StoreResult<()> {
        self.mutate(
            |s| s.namespaces.remove(name),
            |s, prev| { if let Some(p) = prev { s.namespaces.insert(p.name.clone(), p); } },
        )
    }

    fn backend_name(&self) -> &'static str { "file" }
}
