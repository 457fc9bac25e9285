use super::*;
use crate::storage::{MemoryStore, SecretStore, StoreError, StoreResult};
use crate::model::Namespace;
use std::sync::Arc;

fn directory() -> (Arc<MemoryStore>, IdentityDirectory) {
    let store = Arc::new(MemoryStore::new());
    let dir = IdentityDirectory::new(store.clone(), DirectoryConfig::default());
    (store, dir)
}

#[test]
fn create_then_get() {
    let (_store, dir) = directory();
    let created = dir.create("alice", "password1", false, Some("ns")).unwrap();
    let got = dir.get("alice").unwrap();
    assert_eq!(got, created);
    assert_eq!(got.name, "alice");
    assert!(!got.stream_key.is_empty());
    assert!(got.password.is_generated);
    assert_eq!(got.namespace.as_deref(), Some("ns"));
    assert!(got.session.is_empty());
    assert!(passwords::verify("password1", &got.password.hash).unwrap());
}

#[test]
fn empty_namespace_means_unscoped() {
    let (_store, dir) = directory();
    let u = dir.create("bob", "password1", false, Some("")).unwrap();
    assert_eq!(u.namespace, None);
}

#[test]
fn duplicate_create_does_not_mutate() {
    let (_store, dir) = directory();
    let first = dir.create("alice", "password1", false, Some("ns")).unwrap();
    let err = dir.create("alice", "password2", true, None).unwrap_err();
    assert!(matches!(err, DirectoryError::UserAlreadyExists(ref n) if n == "alice"));
    assert_eq!(dir.get("alice").unwrap(), first);
}

#[test]
fn create_validates_lengths() {
    let (_store, dir) = directory();
    assert!(matches!(dir.create("al", "password1", false, None), Err(DirectoryError::Validation(ValidationError::UsernameLength))));
    let long = "a".repeat(33);
    assert!(matches!(dir.create(&long, "password1", false, None), Err(DirectoryError::Validation(ValidationError::UsernameLength))));
    assert!(dir.create(&"a".repeat(32), "password1", false, None).is_ok());
    assert!(matches!(dir.create("carol", "short", false, None), Err(DirectoryError::Validation(ValidationError::PasswordLength))));
    assert!(dir.create("abc", "12345678", false, None).is_ok());
}

#[test]
fn stream_keys_are_unique() {
    let (_store, dir) = directory();
    let a = dir.create("alice", "password1", false, None).unwrap();
    let b = dir.create("bobby", "password1", false, None).unwrap();
    assert_ne!(a.stream_key, b.stream_key);
}

#[test]
fn get_missing_is_not_found() {
    let (_store, dir) = directory();
    assert!(matches!(dir.get("ghost"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn default_admin_is_created_once() {
    let (_store, dir) = directory();
    let password = dir.create_default_admin_user().unwrap().expect("first call returns password");
    let admin = dir.get(DEFAULT_ADMIN_USERNAME).unwrap();
    assert!(admin.is_admin);
    assert!(admin.password.is_generated);
    assert!(passwords::verify(&password, &admin.password.hash).unwrap());
    assert_eq!(dir.create_default_admin_user().unwrap(), None);
    assert_eq!(dir.get(DEFAULT_ADMIN_USERNAME).unwrap(), admin);
}

#[test]
fn default_admin_name_comes_from_config() {
    let store = Arc::new(MemoryStore::new());
    let cfg = DirectoryConfig { admin_username: "root-operator".into(), ..Default::default() };
    let dir = IdentityDirectory::new(store, cfg);
    assert!(dir.create_default_admin_user().unwrap().is_some());
    assert!(dir.get("root-operator").unwrap().is_admin);
    assert!(matches!(dir.get(DEFAULT_ADMIN_USERNAME), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn delete_and_list() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    dir.create("bobby", "password1", true, None).unwrap();
    let mut names: Vec<String> = dir.get_all_users().unwrap().into_iter().map(|u| u.name).collect();
    names.sort();
    assert_eq!(names, vec!["alice", "bobby"]);
    dir.delete("alice").unwrap();
    assert!(matches!(dir.get("alice"), Err(DirectoryError::UserNotFound(_))));
    dir.delete("alice").unwrap();
    assert_eq!(dir.get_all_users().unwrap().len(), 1);
}

#[test]
fn change_password_clears_generated_flag() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    dir.change_password("alice", "new-password").unwrap();
    let u = dir.get("alice").unwrap();
    assert!(!u.password.is_generated);
    assert!(passwords::verify("new-password", &u.password.hash).unwrap());
    assert!(!passwords::verify("password1", &u.password.hash).unwrap());
    assert!(matches!(dir.change_password("ghost", "new-password"), Err(DirectoryError::UserNotFound(_))));
    assert!(matches!(dir.change_password("alice", "short"), Err(DirectoryError::Validation(_))));
}

#[test]
fn reset_password_returns_plaintext_once() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    dir.change_password("alice", "chosen-password").unwrap();
    let generated = dir.reset_password("alice").unwrap();
    let u = dir.get("alice").unwrap();
    assert!(u.password.is_generated);
    assert!(!u.password.hash.contains(&generated));
    assert!(passwords::verify(&generated, &u.password.hash).unwrap());
    assert!(matches!(dir.reset_password("ghost"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn reset_stream_key_rotates() {
    let (_store, dir) = directory();
    let before = dir.create("alice", "password1", false, None).unwrap().stream_key;
    let after = dir.reset_stream_key("alice").unwrap();
    assert_ne!(before, after);
    assert_eq!(dir.get("alice").unwrap().stream_key, after);
    assert!(matches!(dir.reset_stream_key("ghost"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn login_issues_session() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    let before = Utc::now();
    let u = dir.login("alice", "password1").unwrap();
    assert_ne!(u.session.id, 0);
    let exp = u.session.expiration.unwrap();
    assert!(exp >= before + Duration::minutes(15));
    assert!(exp <= Utc::now() + Duration::minutes(15));
    assert_eq!(dir.get("alice").unwrap().session, u.session);
    assert!(dir.verify_session("alice", &u.session.id.to_string()).unwrap());
}

#[test]
fn wrong_password_keeps_prior_session() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    let u = dir.login("alice", "password1").unwrap();
    let err = dir.login("alice", "wrong").unwrap_err();
    assert!(matches!(err, DirectoryError::WrongPassword));
    assert_eq!(dir.get("alice").unwrap().session, u.session);
    assert!(matches!(dir.login("ghost", "password1"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn logout_clears_session() {
    let (_store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();
    let u = dir.login("alice", "password1").unwrap();
    let out = dir.logout("alice").unwrap();
    assert_eq!(out.session, UserSession::default());
    assert!(!dir.verify_session("alice", &u.session.id.to_string()).unwrap());
    assert!(matches!(dir.logout("ghost"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn out_of_range_ttl_fails_login_without_touching_the_record() {
    let store = Arc::new(MemoryStore::new());
    let cfg = DirectoryConfig { session_ttl: Duration::try_seconds(10_000_000_000_000).unwrap(), ..Default::default() };
    let dir = IdentityDirectory::new(store, cfg);
    let before = dir.create("alice", "password1", false, None).unwrap();
    let err = dir.login("alice", "password1").unwrap_err();
    assert!(matches!(err, DirectoryError::SessionLifetime));
    assert!(err.is_internal());
    assert_eq!(dir.get("alice").unwrap(), before);
}

#[test]
fn verify_session_rejects_expired_and_wrong_ids() {
    let (store, dir) = directory();
    dir.create("alice", "password1", false, None).unwrap();

    let mut live = dir.get("alice").unwrap();
    live.session = UserSession { id: 77, expiration: Some(Utc::now() + Duration::minutes(5)) };
    store.set_user(&live).unwrap();
    assert!(dir.verify_session("alice", "77").unwrap());
    assert!(!dir.verify_session("alice", "78").unwrap());
    assert!(!dir.verify_session("alice", "077").unwrap());

    live.session.expiration = Some(Utc::now() - Duration::seconds(1));
    store.set_user(&live).unwrap();
    assert!(!dir.verify_session("alice", "77").unwrap());
    assert!(matches!(dir.verify_session("ghost", "77"), Err(DirectoryError::UserNotFound(_))));
}

#[test]
fn corrupt_stored_hash_is_internal_error() {
    let (store, dir) = directory();
    let mut u = dir.create("alice", "password1", false, None).unwrap();
    u.password.hash = "not-a-hash".into();
    store.set_user(&u).unwrap();
    let err = dir.login("alice", "password1").unwrap_err();
    assert!(err.is_internal());
}

struct BrokenStore;

impl SecretStore for BrokenStore {
    fn init(&self) -> StoreResult<()> { Ok(()) }
    fn close(&self) -> StoreResult<()> { Ok(()) }
    fn set_user(&self, _: &User) -> StoreResult<()> { Err(StoreError::Closed) }
    fn get_user(&self, _: &str) -> StoreResult<Option<User>> { Err(StoreError::Closed) }
    fn get_all_users(&self) -> StoreResult<Vec<User>> { Err(StoreError::Closed) }
    fn delete_user(&self, _: &str) -> StoreResult<()> { Err(StoreError::Closed) }
    fn set_namespace(&self, _: &Namespace) -> StoreResult<()> { Err(StoreError::Closed) }
    fn get_namespace(&self, _: &str) -> StoreResult<Option<Namespace>> { Err(StoreError::Closed) }
    fn get_all_namespaces(&self) -> StoreResult<Vec<Namespace>> { Err(StoreError::Closed) }
    fn delete_namespace(&self, _: &str) -> StoreResult<()> { Err(StoreError::Closed) }
    fn backend_name(&self) -> &'static str { "broken" }
}

#[test]
fn storage_failures_surface_as_internal() {
    let dir = IdentityDirectory::new(Arc::new(BrokenStore), DirectoryConfig::default());
    let err = dir.get("alice").unwrap_err();
    assert!(err.is_internal());
    assert!(!err.is_not_found());
    assert!(dir.create("alice", "password1", false, None).unwrap_err().is_internal());
    assert!(dir.create_default_admin_user().unwrap_err().is_internal());
}
