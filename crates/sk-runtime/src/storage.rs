use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use sk_core::{ScriptletError, STORAGE_METADATA, STORAGE_READ};

/// Read-only access to scriptlet sources, addressed by absolute path.
pub trait ScriptletStorage {
    fn modified(&self, path: &Path) -> Result<SystemTime, ScriptletError>;
    fn read(&self, path: &Path) -> Result<String, ScriptletError>;
}

fn map_storage_error(code: &str, path: &Path, error: impl std::fmt::Display) -> ScriptletError {
    ScriptletError::new(code, format!("{}: {}", path.display(), error))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl ScriptletStorage for FsStorage {
    fn modified(&self, path: &Path) -> Result<SystemTime, ScriptletError> {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|error| map_storage_error(STORAGE_METADATA, path, error))
    }

    fn read(&self, path: &Path) -> Result<String, ScriptletError> {
        fs::read_to_string(path).map_err(|error| map_storage_error(STORAGE_READ, path, error))
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    source: String,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryStorageState {
    files: RefCell<BTreeMap<PathBuf, MemoryFile>>,
    metadata_reads: Cell<u64>,
}

/// In-memory storage with explicit modification times. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Rc<MemoryStorageState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, source: impl Into<String>, modified: SystemTime) {
        self.state.files.borrow_mut().insert(
            path.into(),
            MemoryFile {
                source: source.into(),
                modified,
            },
        );
    }

    /// Replaces the content while keeping the recorded modification time.
    pub fn set_source(&self, path: &Path, source: impl Into<String>) {
        if let Some(file) = self.state.files.borrow_mut().get_mut(path) {
            file.source = source.into();
        }
    }

    pub fn touch(&self, path: &Path, modified: SystemTime) {
        if let Some(file) = self.state.files.borrow_mut().get_mut(path) {
            file.modified = modified;
        }
    }

    pub fn metadata_reads(&self) -> u64 {
        self.state.metadata_reads.get()
    }

    fn get(&self, path: &Path) -> Option<MemoryFile> {
        self.state.files.borrow().get(path).cloned()
    }
}

impl ScriptletStorage for MemoryStorage {
    fn modified(&self, path: &Path) -> Result<SystemTime, ScriptletError> {
        self.state
            .metadata_reads
            .set(self.state.metadata_reads.get() + 1);
        self.get(path)
            .map(|file| file.modified)
            .ok_or_else(|| map_storage_error(STORAGE_METADATA, path, "no such scriptlet"))
    }

    fn read(&self, path: &Path) -> Result<String, ScriptletError> {
        self.get(path)
            .map(|file| file.source)
            .ok_or_else(|| map_storage_error(STORAGE_READ, path, "no such scriptlet"))
    }
}
