use std::path::{Component, Path, PathBuf};

use sk_core::{ScriptletError, SCRIPTLET_EXTENSION, STORAGE_METADATA};

/// Resolves a scriptlet reference against the working directory.
pub fn absolute_path(reference: &Path) -> Result<PathBuf, ScriptletError> {
    let joined = if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|error| {
                ScriptletError::new(
                    STORAGE_METADATA,
                    format!("Cannot resolve working directory: {}", error),
                )
            })?
            .join(reference)
    };
    Ok(normalize_path(&joined))
}

/// Path of the scriptlet `name` living next to `directory`, extension appended.
pub fn sibling_path(directory: &Path, name: &str) -> PathBuf {
    normalize_path(&directory.join(format!("{}.{}", name, SCRIPTLET_EXTENSION)))
}

pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
