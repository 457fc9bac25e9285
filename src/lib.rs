pub mod config;
pub mod error;
pub mod identity;
pub mod locks;
pub mod model;
pub mod namespaces;
pub mod passwords;
pub mod secrets;
pub mod server;
pub mod storage;
pub mod validator;

pub use identity::{DirectoryConfig, IdentityDirectory};
pub use namespaces::NamespaceDirectory;
pub use storage::{FileStore, MemoryStore, SecretStore, SharedStore};
pub use validator::{Decision, RequestValidator};
