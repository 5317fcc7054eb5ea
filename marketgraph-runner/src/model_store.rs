//! File-backed model store.
//!
//! - One pretty-printed JSON snapshot at a fixed path
//! - Atomic writes (write to .tmp, rename into place)
//! - Snapshots with a newer `schema_version` are rejected
//!
//! Concurrent runs against the same path are last-writer-wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use marketgraph_core::analysis::{ModelStore, StoreError, StructureModel, MODEL_SCHEMA_VERSION};

#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Delete the snapshot. Returns whether there was one.
    pub fn clear(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "model.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<Option<StructureModel>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        let model: StructureModel = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))?;
        if model.schema_version > MODEL_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: model.schema_version,
                supported: MODEL_SCHEMA_VERSION,
            });
        }
        debug!("read model snapshot from {}", self.path.display());
        Ok(Some(model))
    }

    fn save(&self, model: &StructureModel) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(model)
            .map_err(|e| StoreError::Corrupt(format!("serialize model: {e}")))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.io_error(e)
        })?;
        debug!("wrote model snapshot to {}", self.path.display());
        Ok(())
    }
}
