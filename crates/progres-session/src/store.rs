//! Persistence of the client session between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// What survives a restart. The refresh cookie is kept so that a terminal
/// client can renew a session begun in an earlier process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: Option<String>,
    pub uuid: Option<String>,
    pub student_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_cookie: Option<String>,
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: Mutex<Option<PersistedSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        Ok(session.clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let mut slot = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}

/// Stores the session as a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
