use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::password::{hash_password, validate_credentials, verify_password, HASH_SCHEME};
use crate::modules::encryption::derive_key_from_password;
use crate::modules::utils::logging::{log_auth_event, log_data_operation};
use crate::modules::utils::time::get_current_timestamp;

/// Opaque numeric user identifier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String, // Unique and case-sensitive
    pub password_hash: String,
    pub created_at: u64,
}

/// Failures of the backing store itself
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serialization(String),
    Corrupt(String),
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Serialization(msg) => write!(f, "Invalid user store data: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "Corrupt user record: {}", msg),
            StoreError::Poisoned => write!(f, "User store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

#[derive(Debug)]
pub enum RegistrationError {
    DuplicateName,
    InvalidInput,
    Storage(StoreError),
}

impl RegistrationError {
    /// Text shown on the registration page
    pub fn user_message(&self) -> &'static str {
        match self {
            RegistrationError::DuplicateName => "Ez a felhasználónév már foglalt.",
            RegistrationError::InvalidInput => "A felhasználónév és jelszó megadása kötelező.",
            RegistrationError::Storage(_) => "A regisztráció nem sikerült, próbáld újra később.",
        }
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicateName => write!(f, "user name already exists"),
            RegistrationError::InvalidInput => write!(f, "user name and password are required"),
            RegistrationError::Storage(e) => write!(f, "registration failed: {}", e),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<StoreError> for RegistrationError {
    fn from(error: StoreError) -> Self {
        RegistrationError::Storage(error)
    }
}

#[derive(Debug)]
pub enum AuthError {
    NotFound,
    WrongPassword,
    Storage(StoreError),
}

/// Shared by unknown names and wrong passwords so the page never reveals
/// which names are registered
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Hibás felhasználónév vagy jelszó.";

impl AuthError {
    /// Text shown on the login page
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotFound | AuthError::WrongPassword => INVALID_CREDENTIALS_MESSAGE,
            AuthError::Storage(_) => "A bejelentkezés nem sikerült, próbáld újra később.",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotFound => write!(f, "no such user"),
            AuthError::WrongPassword => write!(f, "password does not match"),
            AuthError::Storage(e) => write!(f, "authentication failed: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::Storage(error)
    }
}

/// The persisted user document
#[derive(Serialize, Deserialize, Default)]
pub struct UserStore {
    pub users: HashMap<String, User>,
    pub next_id: u64,
}

impl UserStore {
    /// Insert a user under its name. The name is the uniqueness key.
    fn insert(&mut self, name: &str, password_hash: String) -> Result<UserId, RegistrationError> {
        if self.users.contains_key(name) {
            return Err(RegistrationError::DuplicateName);
        }

        self.next_id += 1;
        let id = UserId(self.next_id);
        let user = User {
            id,
            name: name.to_string(),
            password_hash,
            created_at: get_current_timestamp(),
        };
        self.users.insert(name.to_string(), user);
        Ok(id)
    }

    /// Undo the most recent insert after a failed commit
    fn rollback_insert(&mut self, name: &str) {
        if self.users.remove(name).is_some() {
            self.next_id -= 1;
        }
    }
}

/// Authoritative registry of users and their password hashes.
///
/// Backed by a JSON file that is replaced atomically on every write, or held
/// only in memory. The internal lock is the commit boundary; password hashing
/// always happens outside it.
pub struct CredentialStore {
    path: Option<PathBuf>,
    users: Mutex<UserStore>,
    iterations: u32,
}

impl CredentialStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>, iterations: u32) -> Result<Self, StoreError> {
        let path = path.into();
        let store = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => UserStore::default(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        log::info!(
            "Opened user store {} with {} users",
            path.display(),
            store.users.len()
        );

        Ok(Self {
            path: Some(path),
            users: Mutex::new(store),
            iterations,
        })
    }

    /// A store that is never written to disk
    pub fn in_memory(iterations: u32) -> Self {
        Self {
            path: None,
            users: Mutex::new(UserStore::default()),
            iterations,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, UserStore>, StoreError> {
        self.users.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Register a new user and return its id
    pub fn register(&self, name: &str, password: &str) -> Result<UserId, RegistrationError> {
        validate_credentials(name, password)?;

        // Skip the expensive hash for names that are obviously taken
        if self.lock()?.users.contains_key(name) {
            log_data_operation("register", name, "user_store", false, Some("duplicate name"));
            return Err(RegistrationError::DuplicateName);
        }

        let password_hash = hash_password(password, self.iterations);

        let mut store = self.lock()?;
        let id = match store.insert(name, password_hash) {
            Ok(id) => id,
            Err(e) => {
                log_data_operation("register", name, "user_store", false, Some(&e.to_string()));
                return Err(e);
            }
        };

        if let Err(e) = self.commit(&store) {
            store.rollback_insert(name);
            log_data_operation("register", name, "user_store", false, Some(&e.to_string()));
            return Err(e.into());
        }

        log_data_operation("register", name, "user_store", true, None);
        Ok(id)
    }

    /// Check a name and password pair and return the matching user's id
    pub fn verify(&self, name: &str, password: &str) -> Result<UserId, AuthError> {
        let stored = self
            .lock()?
            .users
            .get(name)
            .map(|user| (user.id, user.password_hash.clone()));

        let Some((id, password_hash)) = stored else {
            // Same work as a real check so response time does not reveal the name
            let _ = derive_key_from_password(password, &[0u8; 16], self.iterations);
            log_auth_event("login", name, false, Some("unknown user"));
            return Err(AuthError::NotFound);
        };

        match verify_password(password, &password_hash) {
            Ok(true) => {
                log_auth_event("login", name, true, None);
                Ok(id)
            }
            Ok(false) => {
                log_auth_event("login", name, false, Some("wrong password"));
                Err(AuthError::WrongPassword)
            }
            Err(e) => {
                log_auth_event("login", name, false, Some(&e.to_string()));
                Err(AuthError::Storage(StoreError::Corrupt(format!(
                    "user {} has a password hash that is not {}",
                    id, HASH_SCHEME
                ))))
            }
        }
    }

    /// Look a user up by name
    pub fn find_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(name).cloned())
    }

    /// Look a user up by id
    pub fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.id == id)
            .cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.users.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Write the whole document to a temporary file and rename it into place
    fn commit(&self, store: &UserStore) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let data = serde_json::to_vec_pretty(store)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&data)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn test_register_then_verify() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);

        let id = store.register("alice", "s3cret").unwrap();
        assert_eq!(store.verify("alice", "s3cret").unwrap(), id);

        let user = store.find_by_name("alice").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "alice");
        assert_ne!(user.password_hash, "s3cret");
        assert_eq!(store.find_by_id(id).unwrap(), Some(user));
    }

    #[test]
    fn test_duplicate_name() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);

        store.register("bob", "x").unwrap();
        assert!(matches!(
            store.register("bob", "y"),
            Err(RegistrationError::DuplicateName)
        ));

        // The original password still applies
        assert!(matches!(
            store.verify("bob", "y"),
            Err(AuthError::WrongPassword)
        ));
        assert!(store.verify("bob", "x").is_ok());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);

        let lower = store.register("alice", "one").unwrap();
        let upper = store.register("Alice", "two").unwrap();
        assert_ne!(lower, upper);

        assert!(matches!(
            store.verify("ALICE", "one"),
            Err(AuthError::NotFound)
        ));
        assert_eq!(store.verify("Alice", "two").unwrap(), upper);
    }

    #[test]
    fn test_invalid_input() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);

        assert!(matches!(
            store.register("", "s3cret"),
            Err(RegistrationError::InvalidInput)
        ));
        assert!(matches!(
            store.register("alice", ""),
            Err(RegistrationError::InvalidInput)
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_unknown_and_wrong_password_share_user_message() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);
        store.register("alice", "s3cret").unwrap();

        let unknown = store.verify("mallory", "s3cret").unwrap_err();
        let wrong = store.verify("alice", "guess").unwrap_err();

        assert!(matches!(unknown, AuthError::NotFound));
        assert!(matches!(wrong, AuthError::WrongPassword));
        assert_eq!(unknown.user_message(), wrong.user_message());
        assert_eq!(unknown.user_message(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn test_ids_are_sequential() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);
        let first = store.register("alice", "a").unwrap();
        let second = store.register("bob", "b").unwrap();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let id = {
            let store = CredentialStore::open(&path, TEST_ITERATIONS).unwrap();
            assert!(store.is_empty().unwrap());
            store.register("alice", "s3cret").unwrap()
        };

        let reopened = CredentialStore::open(&path, TEST_ITERATIONS).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.verify("alice", "s3cret").unwrap(), id);

        // Ids keep counting after a reopen
        let next = reopened.register("bob", "x").unwrap();
        assert_eq!(next.get(), id.get() + 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("s3cret"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            CredentialStore::open(&path, TEST_ITERATIONS),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("users.json");
        let store = CredentialStore::open(&path, TEST_ITERATIONS).unwrap();

        assert!(matches!(
            store.register("alice", "s3cret"),
            Err(RegistrationError::Storage(StoreError::Io(_)))
        ));
        assert!(store.find_by_name("alice").unwrap().is_none());
        assert!(matches!(
            store.verify("alice", "s3cret"),
            Err(AuthError::NotFound)
        ));
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let store = Arc::new(CredentialStore::in_memory(TEST_ITERATIONS));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.register("carol", &format!("password-{}", i)))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(RegistrationError::DuplicateName)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_hash_is_storage_error() {
        let store = CredentialStore::in_memory(TEST_ITERATIONS);
        store.register("alice", "s3cret").unwrap();
        store
            .lock()
            .unwrap()
            .users
            .get_mut("alice")
            .unwrap()
            .password_hash = "plaintext".to_string();

        assert!(matches!(
            store.verify("alice", "s3cret"),
            Err(AuthError::Storage(StoreError::Corrupt(_)))
        ));
    }
}
