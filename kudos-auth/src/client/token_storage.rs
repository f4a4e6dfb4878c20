use crate::common::StoredSession;
use crate::error::AuthError;
use chrono::Utc;
use kudos_api::endpoints::auth::Role;
use kudos_api::{StorageError, TokenStorage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Session record on disk, mirrored in memory.
///
/// Clearing the token removes the whole record, refresh cookie and cached
/// identity included.
#[derive(Debug)]
pub struct FileTokenStore {
    session_path: PathBuf,
    session: Mutex<Option<StoredSession>>,
}

impl FileTokenStore {
    /// Open the store at the default location (`<cache dir>/kudos/session.json`).
    pub fn new() -> Result<Self, AuthError> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find cache directory".to_string()))?
            .join("kudos");
        Ok(cache_dir.join("session.json"))
    }

    pub fn open(session_path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let session_path = session_path.into();

        if let Some(dir) = session_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to create cache directory: {}", e))
                })?;
            }
        }

        let session = read_session(&session_path)?;
        Ok(Self {
            session_path,
            session: Mutex::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.session_path
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.lock().clone()
    }

    /// Record who is logged in and the refresh cookie issued with the session.
    pub fn remember(
        &self,
        login: &str,
        role: Option<Role>,
        refresh_cookie: Option<String>,
    ) -> Result<(), AuthError> {
        self.update(|session| {
            session.login = Some(login.to_string());
            session.role = role;
            if refresh_cookie.is_some() {
                session.refresh_cookie = refresh_cookie;
            }
        })
        .map_err(storage_error)
    }

    /// Persist a (possibly rotated) refresh cookie. No-op without a session.
    pub fn set_refresh_cookie(&self, refresh_cookie: Option<String>) -> Result<(), AuthError> {
        let Some(refresh_cookie) = refresh_cookie else {
            return Ok(());
        };
        self.update(|session| {
            session.refresh_cookie = Some(refresh_cookie);
        })
        .map_err(storage_error)
    }

    fn lock(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSession)) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let Some(session) = guard.as_mut() else {
            return Ok(());
        };
        apply(session);
        write_session(&self.session_path, session)
    }
}

impl TokenStorage for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.lock().as_ref().map(|session| session.access_token.clone()))
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let session = match guard.take() {
            Some(mut session) => {
                session.access_token = token.to_string();
                session.saved_at = Utc::now();
                session
            }
            None => StoredSession::new(token),
        };
        let written = write_session(&self.session_path, &session);
        *guard = Some(session);
        written
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.lock();
        *guard = None;
        if self.session_path.exists() {
            fs::remove_file(&self.session_path)?;
        }
        tracing::debug!(path = %self.session_path.display(), "Session cleared");
        Ok(())
    }
}

fn read_session(path: &Path) -> Result<Option<StoredSession>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .map_err(|e| AuthError::TokenStorage(format!("Failed to read session: {}", e)))?;
    let session: StoredSession = serde_json::from_str(&json)?;
    Ok(Some(session))
}

fn write_session(path: &Path, session: &StoredSession) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(session)?;
    fs::write(path, json)?;

    // Set permissions to 0600 (read/write for owner only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn storage_error(err: StorageError) -> AuthError {
    AuthError::TokenStorage(err.to_string())
}
