use thiserror::Error;

pub const DEPENDENCY_LOOP: &str = "DEPENDENCY_LOOP";
pub const DEPENDENCY_MISSING: &str = "DEPENDENCY_MISSING";
pub const DEFINE_MISSING: &str = "DEFINE_MISSING";
pub const DEFINE_INVALID: &str = "DEFINE_INVALID";
pub const SCRIPTLET_COMPILE: &str = "SCRIPTLET_COMPILE";
pub const SCRIPTLET_EVAL: &str = "SCRIPTLET_EVAL";
pub const FACTORY_CALL: &str = "FACTORY_CALL";
pub const STORAGE_READ: &str = "STORAGE_READ";
pub const STORAGE_METADATA: &str = "STORAGE_METADATA";
pub const VALUE_UNSUPPORTED: &str = "VALUE_UNSUPPORTED";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ScriptletError {
    pub code: String,
    pub message: String,
}

impl ScriptletError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn dependency_loop(path: impl std::fmt::Display) -> Self {
        Self::new(
            DEPENDENCY_LOOP,
            format!("Scriptlet \"{}\" is already being loaded.", path),
        )
    }

    pub fn dependency_missing(name: &str, from: impl std::fmt::Display) -> Self {
        Self::new(
            DEPENDENCY_MISSING,
            format!("Dependency \"{}\" required by \"{}\" cannot be resolved.", name, from),
        )
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}
