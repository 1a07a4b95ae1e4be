use super::{read_document, write_document};
use crate::core::error::{RateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.json";

/// The logged-in user, loaded once at process start and handed to commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: Option<String>,
}

impl Session {
    pub fn require_user(&self) -> Result<&str> {
        self.username.as_deref().ok_or(RateError::NotLoggedIn)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    /// Loads the persisted session. A missing or unreadable session means
    /// nobody is logged in.
    pub fn load(&self) -> Session {
        read_document(&self.path).ok().flatten().unwrap_or_default()
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        write_document(&self.path, session)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RateError::Storage {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}
