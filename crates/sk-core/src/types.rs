use std::fmt;

use serde::{Deserialize, Serialize};

/// Extension appended to every relative scriptlet reference.
pub const SCRIPTLET_EXTENSION: &str = "rhai";

/// Reserved dependency name that resolves to the bound loader function.
pub const LOAD_DEPENDENCY: &str = "$load";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Always recompile.
    #[default]
    None,
    /// Reuse any cached artifact regardless of storage changes.
    Full,
    /// Reuse a cached artifact only while its modification time is unchanged.
    Mtime,
}

impl CachePolicy {
    /// Unrecognized names fall back to [`CachePolicy::None`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" => Self::Full,
            "mtime" | "modification-time" => Self::Mtime,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Full => "full",
            Self::Mtime => "mtime",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compiles: u64,
}
