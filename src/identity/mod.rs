//! User directory: account lifecycle, credentials, and dashboard sessions.
//!
//! Plaintext secrets (generated passwords, stream keys) are returned exactly once to
//! the caller and never stored; only the encoded password hash is persisted.

pub mod session;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::error::{DirectoryError, DirectoryResult, ValidationError};
use crate::locks::KeyLocks;
use crate::model::{User, UserPassword, UserSession};
use crate::passwords;
use crate::secrets::random_text;
use crate::storage::SharedStore;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Name of the bootstrap administrator created by `create_default_admin_user`.
    pub admin_username: String,
    pub session_ttl: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { admin_username: DEFAULT_ADMIN_USERNAME.to_string(), session_ttl: session::default_ttl() }
    }
}

fn validate_username(name: &str) -> Result<(), ValidationError> {
    if name.len() < MIN_USERNAME_LEN || name.len() > MAX_USERNAME_LEN {
        return Err(ValidationError::UsernameLength);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LEN { return Err(ValidationError::PasswordLength); }
    Ok(())
}

pub struct IdentityDirectory {
    store: SharedStore,
    config: DirectoryConfig,
    locks: KeyLocks,
}

impl IdentityDirectory {
    pub fn new(store: SharedStore, config: DirectoryConfig) -> Self {
        Self { store, config, locks: KeyLocks::new() }
    }

    pub fn config(&self) -> &DirectoryConfig { &self.config }

    fn load(&self, name: &str) -> DirectoryResult<User> {
        self.store.get_user(name)?.ok_or_else(|| DirectoryError::UserNotFound(name.to_string()))
    }

    /// Run `f` on the stored record for `name` under its lock and persist the result.
    fn update<T>(&self, name: &str, f: impl FnOnce(&mut User) -> DirectoryResult<T>) -> DirectoryResult<(User, T)> {
        let lock = self.locks.for_key(name);
        let _guard = lock.lock();
        let mut user = self.load(name)?;
        let out = f(&mut user)?;
        self.store.set_user(&user)?;
        Ok((user, out))
    }

    pub fn create(&self, name: &str, password: &str, is_admin: bool, namespace: Option<&str>) -> DirectoryResult<User> {
        validate_username(name)?;
        validate_password(password)?;
        self.create_unchecked(name, password, is_admin, namespace)
    }

    fn create_unchecked(&self, name: &str, password: &str, is_admin: bool, namespace: Option<&str>) -> DirectoryResult<User> {
        let lock = self.locks.for_key(name);
        let _guard = lock.lock();
        if self.store.get_user(name)?.is_some() {
            return Err(DirectoryError::UserAlreadyExists(name.to_string()));
        }
        let user = User {
            name: name.to_string(),
            stream_key: random_text()?,
            is_admin,
            password: UserPassword { hash: passwords::hash(password)?, is_generated: true },
            session: UserSession::default(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        };
        self.store.set_user(&user)?;
        info!(target: "streamgate::identity", user = %name, is_admin, namespace = ?user.namespace, "user created");
        Ok(user)
    }

    /// Bootstrap the configured administrator. Returns the generated password the one
    /// time the account is created, `None` when it already exists.
    pub fn create_default_admin_user(&self) -> DirectoryResult<Option<String>> {
        let password = random_text()?;
        match self.create_unchecked(&self.config.admin_username, &password, true, None) {
            Ok(_) => Ok(Some(password)),
            Err(DirectoryError::UserAlreadyExists(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, name: &str) -> DirectoryResult<User> { self.load(name) }

    pub fn delete(&self, name: &str) -> DirectoryResult<()> {
        let lock = self.locks.for_key(name);
        let _guard = lock.lock();
        self.store.delete_user(name)?;
        info!(target: "streamgate::identity", user = %name, "user deleted");
        Ok(())
    }

    pub fn get_all_users(&self) -> DirectoryResult<Vec<User>> { Ok(self.store.get_all_users()?) }

    pub fn change_password(&self, name: &str, password: &str) -> DirectoryResult<()> {
        validate_password(password)?;
        self.update(name, |user| {
            user.password = UserPassword { hash: passwords::hash(password)?, is_generated: false };
            Ok(())
        })?;
        info!(target: "streamgate::identity", user = %name, "password changed");
        Ok(())
    }

    /// Replace the password with a generated one and return it.
    pub fn reset_password(&self, name: &str) -> DirectoryResult<String> {
        let (_, generated) = self.update(name, |user| {
            let generated = random_text()?;
            user.password = UserPassword { hash: passwords::hash(&generated)?, is_generated: true };
            Ok(generated)
        })?;
        info!(target: "streamgate::identity", user = %name, "password reset");
        Ok(generated)
    }

    pub fn reset_stream_key(&self, name: &str) -> DirectoryResult<String> {
        let (_, key) = self.update(name, |user| {
            user.stream_key = random_text()?;
            Ok(user.stream_key.clone())
        })?;
        info!(target: "streamgate::identity", user = %name, "stream key reset");
        Ok(key)
    }

    /// Verify credentials and open a new dashboard session. A wrong password leaves the
    /// stored record, including any existing session, untouched.
    pub fn login(&self, name: &str, password: &str) -> DirectoryResult<User> {
        let ttl = self.config.session_ttl;
        let (user, _) = self.update(name, |user| {
            if !passwords::verify(password, &user.password.hash)? {
                debug!(target: "streamgate::identity", user = %user.name, "login rejected: wrong password");
                return Err(DirectoryError::WrongPassword);
            }
            user.session = session::issue(Utc::now(), ttl)?;
            Ok(())
        })?;
        info!(target: "streamgate::identity", user = %name, "login");
        Ok(user)
    }

    pub fn logout(&self, name: &str) -> DirectoryResult<User> {
        let (user, _) = self.update(name, |user| {
            user.session = UserSession::default();
            Ok(())
        })?;
        info!(target: "streamgate::identity", user = %name, "logout");
        Ok(user)
    }

    /// `Ok(false)` for an absent, expired, or mismatching session; `Err` only when the
    /// user does not exist or the store fails.
    pub fn verify_session(&self, name: &str, presented: &str) -> DirectoryResult<bool> {
        let user = self.load(name)?;
        Ok(session::matches(&user.session, presented, Utc::now()))
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
