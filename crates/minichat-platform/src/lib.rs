//! Persisted acting-user identity.
//!
//! The only state the client keeps between launches is which user it acts as. It is
//! stored as a small JSON document behind the [`IdentityStore`] trait so tests and
//! frontends can swap the file for memory.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use minichat_core::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Acting user used when nothing valid is stored.
pub const DEFAULT_ACTING_USER_ID: UserId = 1;

/// File name of the persisted identity inside the data directory.
pub const IDENTITY_FILE_NAME: &str = "acting-user.json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
    #[error("identity store i/o failure on {path}: {message}")]
    Io { path: String, message: String },
    #[error("stored identity is malformed: {0}")]
    Malformed(String),
    #[error("invalid acting user id {0}: must be a positive integer")]
    InvalidUserId(UserId),
}

/// Raw storage for the identity document.
pub trait IdentityStore: Send + Sync {
    /// Stored document, `None` when nothing was saved yet.
    fn load_raw(&self) -> Result<Option<String>, StoreError>;

    fn save_raw(&self, raw: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    data: Arc<RwLock<Option<String>>>,
}

impl InMemoryIdentityStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            data: Arc::new(RwLock::new(Some(raw.into()))),
        }
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn load_raw(&self) -> Result<Option<String>, StoreError> {
        let data = self
            .data
            .read()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
        Ok(data.clone())
    }

    fn save_raw(&self, raw: &str) -> Result<(), StoreError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
        *data = Some(raw.to_owned());
        Ok(())
    }
}

/// JSON file in the app data directory, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/acting-user.json`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(IDENTITY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, err: impl std::fmt::Display) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = self
            .path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or(IDENTITY_FILE_NAME);
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        parent.join(format!(".{file_name}.{now_nanos}.tmp"))
    }
}

impl IdentityStore for FileIdentityStore {
    fn load_raw(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(&self.path, err)),
        }
    }

    fn save_raw(&self, raw: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| Self::io_error(parent, err))?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, raw).map_err(|err| Self::io_error(&temp_path, err))?;

        if let Err(rename_err) = fs::rename(&temp_path, &self.path) {
            // Windows does not allow replacing existing files via rename.
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(Self::io_error(
                        &self.path,
                        format!("replace after rename error ({rename_err}): {err}"),
                    ));
                }
            }
            fs::rename(&temp_path, &self.path).map_err(|err| {
                let _ = fs::remove_file(&temp_path);
                Self::io_error(&self.path, err)
            })?;
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    acting_user_id: UserId,
}

/// Decode and validate a stored identity document.
pub fn parse_acting_user_id(raw: &str) -> Result<UserId, StoreError> {
    let stored: StoredIdentity =
        serde_json::from_str(raw).map_err(|err| StoreError::Malformed(err.to_string()))?;
    if stored.acting_user_id <= 0 {
        return Err(StoreError::InvalidUserId(stored.acting_user_id));
    }
    Ok(stored.acting_user_id)
}

/// Load the persisted acting user, falling back to [`DEFAULT_ACTING_USER_ID`].
///
/// Missing, unreadable, malformed and non-positive values all fall back.
pub fn load_acting_user_id(store: &dyn IdentityStore) -> UserId {
    let raw = match store.load_raw() {
        Ok(Some(raw)) => raw,
        Ok(None) => return DEFAULT_ACTING_USER_ID,
        Err(err) => {
            warn!(error = %err, "failed to read persisted acting user; using default");
            return DEFAULT_ACTING_USER_ID;
        }
    };

    match parse_acting_user_id(&raw) {
        Ok(user_id) => {
            debug!(user_id, "restored persisted acting user");
            user_id
        }
        Err(err) => {
            warn!(error = %err, "ignoring persisted acting user");
            DEFAULT_ACTING_USER_ID
        }
    }
}

/// Persist the acting user; non-positive ids are rejected without writing.
pub fn persist_acting_user_id(
    store: &dyn IdentityStore,
    user_id: UserId,
) -> Result<(), StoreError> {
    if user_id <= 0 {
        return Err(StoreError::InvalidUserId(user_id));
    }
    let raw = serde_json::to_string(&StoredIdentity {
        acting_user_id: user_id,
    })
    .map_err(|err| StoreError::Malformed(err.to_string()))?;
    store.save_raw(&raw)
}
