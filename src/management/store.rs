use std::path::{Path, PathBuf};

use crate::types::StoredSession;

/// On-disk cache for the session obtained by `gramfollow login`.
///
/// This is the CLI-side credential store; the engine itself never persists
/// anything. The path is injectable so tests can point it at a temp dir.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            path: Self::default_path(),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub async fn load(&self) -> Result<StoredSession, String> {
        let content = async_fs::read_to_string(&self.path)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    pub async fn persist(&self, session: &StoredSession) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(session).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("gramfollow/cache/session.json");
        path
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
