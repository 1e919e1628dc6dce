use std::path::{Path, PathBuf};

use sk_core::{ScriptletError, SCRIPTLET_EXTENSION};
use walkdir::WalkDir;

use crate::map_cli_source_path;

pub(crate) fn resolve_scriptlet_dir(dir: &str) -> Result<PathBuf, ScriptletError> {
    let path = PathBuf::from(dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(ScriptletError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scriptlet dir does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_dir() {
        return Err(ScriptletError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("scriptlet dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

pub(crate) fn collect_scriptlets(root: &Path) -> Result<Vec<PathBuf>, ScriptletError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|error| {
            ScriptletError::new("CLI_SOURCE_SCAN", error.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPTLET_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ScriptletError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .{} files found under {}", SCRIPTLET_EXTENSION, root.display()),
        ));
    }

    Ok(files)
}
