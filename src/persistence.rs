//! Persistence layer for pipeline artifacts.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary) formats,
//! chosen by file extension.

use crate::error::{AuditError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Save format for artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

/// Save an artifact, picking the format from the extension.
pub fn save_artifact<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    save_artifact_with_format(value, path, SaveFormat::from_path(path))
}

/// Save an artifact with a specific format.
pub fn save_artifact_with_format<T: Serialize>(
    value: &T,
    path: &Path,
    format: SaveFormat,
) -> Result<()> {
    ensure_parent_dir(path)?;

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| AuditError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::serde::encode_to_vec(value, config)
                .map_err(|e| AuditError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| AuditError::io(path, e))?;

    Ok(())
}

/// Load an artifact, picking the format from the extension.
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(AuditError::ArtifactNotFound(path.to_path_buf()));
    }

    load_artifact_with_format(path, SaveFormat::from_path(path))
}

/// Load an artifact with a specific format.
pub fn load_artifact_with_format<T: DeserializeOwned>(path: &Path, format: SaveFormat) -> Result<T> {
    let data = fs::read(path).map_err(|e| AuditError::io(path, e))?;

    let value = match format {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| AuditError::Serialization(format!("{}: {}", path.display(), e)))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (value, _): (T, usize) = bincode::serde::decode_from_slice(&data, config)
                .map_err(|e| AuditError::Serialization(format!("{}: {}", path.display(), e)))?;
            value
        }
    };

    Ok(value)
}

/// Append one compact JSON line to a file, creating it if needed.
pub fn append_json_line<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    use std::io::Write;

    ensure_parent_dir(path)?;
    let line = serde_json::to_string(value)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AuditError::io(path, e))?;
    writeln!(file, "{}", line).map_err(|e| AuditError::io(path, e))
}

/// Check if an artifact file exists at the given path.
pub fn artifact_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Get the size of an artifact file in bytes.
pub fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| AuditError::io(path, e))?;
    Ok(metadata.len())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| AuditError::io(parent, e))?;
        }
    }
    Ok(())
}
