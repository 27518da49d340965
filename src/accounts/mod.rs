pub mod password;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::AccountInfo;

/// A stored account. The hash stays inside this crate; callers get `AccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub(crate) password_hash: String,
}

impl AccountRecord {
    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Registered accounts, unique by normalized email.
pub struct Accounts {
    by_email: DashMap<String, AccountRecord>,
    email_by_id: DashMap<Ulid, String>,
    registration: Mutex<()>,
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Accounts {
    pub fn new() -> Self {
        Self {
            by_email: DashMap::new(),
            email_by_id: DashMap::new(),
            registration: Mutex::new(()),
        }
    }

    /// Serializes registrations so the duplicate-email check and the commit
    /// cannot interleave.
    pub async fn registration_guard(&self) -> MutexGuard<'_, ()> {
        self.registration.lock().await
    }

    /// Validate the fields and hash the password. Does not store anything.
    pub async fn prepare(
        &self,
        id: Ulid,
        name: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<AccountRecord, EngineError> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() {
            return Err(EngineError::Validation("name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::Validation("a valid email is required".into()));
        }
        if raw_password.is_empty() {
            return Err(EngineError::Validation("password is required".into()));
        }
        if name.len() > MAX_FIELD_LEN || email.len() > MAX_FIELD_LEN {
            return Err(EngineError::LimitExceeded("account field too long"));
        }
        if raw_password.len() > MAX_PASSWORD_LEN {
            return Err(EngineError::LimitExceeded("password too long"));
        }
        if self.email_by_id.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let raw = raw_password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&raw))
            .await
            .map_err(|e| EngineError::StorageUnavailable(format!("hash task failed: {e}")))?
            .map_err(|e| EngineError::StorageUnavailable(e.to_string()))?;

        Ok(AccountRecord {
            id,
            name: name.to_owned(),
            email,
            password_hash,
        })
    }

    pub fn email_taken(&self, email: &str) -> bool {
        self.by_email.contains_key(&normalize_email(email))
    }

    /// Store a prepared (or replayed) record. Returns false if the email or id is taken.
    pub fn insert_now(&self, record: AccountRecord) -> bool {
        if self.email_by_id.contains_key(&record.id) {
            return false;
        }
        match self.by_email.entry(record.email.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                self.email_by_id.insert(record.id, record.email.clone());
                slot.insert(record);
                true
            }
        }
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.email_by_id.contains_key(id)
    }

    pub fn get(&self, id: &Ulid) -> Option<AccountInfo> {
        let email = self.email_by_id.get(id)?.value().clone();
        self.by_email.get(&email).map(|r| r.info())
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }

    pub async fn authenticate(
        &self,
        email: &str,
        raw_password: &str,
    ) -> Result<AccountInfo, EngineError> {
        let email = normalize_email(email);
        let record = self
            .by_email
            .get(&email)
            .map(|r| r.value().clone())
            .ok_or_else(|| EngineError::AccountNotFound(email.clone()))?;

        let raw = raw_password.to_owned();
        let hash = record.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || password::verify_password(&raw, &hash))
            .await
            .map_err(|e| EngineError::StorageUnavailable(format!("verify task failed: {e}")))?
            .map_err(|e| EngineError::StorageUnavailable(e.to_string()))?;

        if verified {
            Ok(record.info())
        } else {
            Err(EngineError::InvalidCredentials)
        }
    }
}
