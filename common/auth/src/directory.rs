use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use common_crypto::{PasswordHash, Salt};
use thiserror::Error;

use crate::principal::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("user '{0}' already exists")]
    Conflict(String),
}

/// Credentials stored for a user at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub hash: PasswordHash,
    pub salt: Salt,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub nickname: String,
    pub credentials: StoredCredentials,
}

/// Account lookups backing the authorization policies and the login path.
///
/// Implementations own their storage and serialize their own reads and writes.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, DirectoryError>;

    async fn is_active_manager(&self, name: &str) -> Result<bool, DirectoryError>;

    async fn credentials_for(&self, name: &str)
        -> Result<Option<StoredCredentials>, DirectoryError>;

    async fn create_user(&self, account: NewAccount) -> Result<(), DirectoryError>;
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    role: Role,
    active: bool,
    credentials: Option<StoredCredentials>,
}

/// Process-local directory for tests and development runs.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    entries: RwLock<HashMap<String, DirectoryEntry>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user without credentials.
    pub fn with_user(self, name: impl Into<String>, role: Role, active: bool) -> Self {
        self.insert_user(name, role, active);
        self
    }

    pub fn insert_user(&self, name: impl Into<String>, role: Role, active: bool) {
        let mut guard = self.entries.write().expect("rwlock poisoned");
        guard.insert(
            name.into(),
            DirectoryEntry {
                role,
                active,
                credentials: None,
            },
        );
    }

    /// Simulate an outage: every call fails with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of directory calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<(), DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "in-memory directory marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, name: &str) -> Result<bool, DirectoryError> {
        self.begin_call()?;
        let guard = self.entries.read().expect("rwlock poisoned");
        Ok(guard.contains_key(name))
    }

    async fn is_active_manager(&self, name: &str) -> Result<bool, DirectoryError> {
        self.begin_call()?;
        let guard = self.entries.read().expect("rwlock poisoned");
        Ok(guard
            .get(name)
            .is_some_and(|entry| entry.active && entry.role == Role::Manager))
    }

    async fn credentials_for(
        &self,
        name: &str,
    ) -> Result<Option<StoredCredentials>, DirectoryError> {
        self.begin_call()?;
        let guard = self.entries.read().expect("rwlock poisoned");
        Ok(guard.get(name).and_then(|entry| entry.credentials.clone()))
    }

    async fn create_user(&self, account: NewAccount) -> Result<(), DirectoryError> {
        self.begin_call()?;
        let mut guard = self.entries.write().expect("rwlock poisoned");
        if guard.contains_key(&account.nickname) {
            return Err(DirectoryError::Conflict(account.nickname));
        }
        let role = account.credentials.role;
        guard.insert(
            account.nickname,
            DirectoryEntry {
                role,
                active: true,
                credentials: Some(account.credentials),
            },
        );
        Ok(())
    }
}
