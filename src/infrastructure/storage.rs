//! JSON file storage rooted at the configured data directory

use crate::error::PlatformError;
use crate::infrastructure::settings::Settings;
use di::{Ref, inject, injectable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CHARACTERS_FILE: &str = "characters.json";
const USERS_FILE: &str = "users.json";
const CONVERSATIONS_DIR: &str = "conversations";

pub struct DataDirectory {
    root: PathBuf,
}

#[injectable]
impl DataDirectory {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> DataDirectory {
        DataDirectory::new(settings.data_dir.clone())
    }
}

impl DataDirectory {
    pub fn new(root: impl Into<PathBuf>) -> DataDirectory {
        DataDirectory { root: root.into() }
    }

    pub fn characters_file(&self) -> PathBuf {
        self.root.join(CHARACTERS_FILE)
    }

    pub fn users_file(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.root.join(CONVERSATIONS_DIR)
    }

    pub fn conversation_file(&self, conversation_id: &str) -> PathBuf {
        self.conversations_dir()
            .join(format!("{conversation_id}.json"))
    }

    /// Reads and decodes a JSON file. A missing file is `Ok(None)`.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<T>, PlatformError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PlatformError::Storage(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| PlatformError::Storage(format!("malformed {}: {e}", path.display())))
    }

    /// Overwrites `path` with the pretty-printed JSON encoding of `value`.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), PlatformError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PlatformError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let data = serde_json::to_vec_pretty(value)
            .map_err(|e| PlatformError::Storage(format!("cannot encode {}: {e}", path.display())))?;

        tokio::fs::write(path, data)
            .await
            .map_err(|e| PlatformError::Storage(format!("cannot write {}: {e}", path.display())))
    }
}
