//! JSON 파일 저장소
//!
//! Launchpad keeps its settings in two places: a per-user directory and a
//! `.launchpad/` directory next to the tools. Writes go through a sibling
//! temp file so a crash never leaves half a JSON document behind.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used for both the global and the project store
const STORE_DIR_NAME: &str = "launchpad";

/// A directory of JSON settings files
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (<config_dir>/launchpad/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join(STORE_DIR_NAME);
        Ok(Self::new(dir))
    }

    /// 프로젝트 설정 (<base>/.launchpad/)
    pub fn project(root: &Path) -> Self {
        Self::new(root.join(format!(".{}", STORE_DIR_NAME)))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// Decode `filename`; `Ok(None)` when the file does not exist
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        read_json(&self.file_path(filename))
    }

    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        write_json(&self.file_path(filename), data)
    }
}

/// Read and decode a JSON file; a missing file is `Ok(None)`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Pretty-print `data` to `path`, replacing the old file in one rename
///
/// Object keys come out sorted.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }
    }

    let value = serde_json::to_value(data)?;
    let mut content = serde_json::to_string_pretty(&value)?;
    content.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, content)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::Config(format!("Failed to write {}: {}", path.display(), e))
        })
}
