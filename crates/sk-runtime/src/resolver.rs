use std::collections::BTreeMap;

use rhai::{Dynamic, Map};
use sk_core::LOAD_DEPENDENCY;

/// How a declared dependency name is resolved, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyToken {
    /// `$load`: a bound loader function.
    Loader,
    /// A caller-supplied binding.
    Binding(String),
    /// A sibling scriptlet, e.g. `./b`.
    Relative(String),
    /// Anything else goes to the host module resolver.
    External(String),
}

impl DependencyToken {
    pub fn classify(name: &str, bindings: &BTreeMap<String, Dynamic>) -> Self {
        if name == LOAD_DEPENDENCY {
            Self::Loader
        } else if bindings.contains_key(name) {
            Self::Binding(name.to_string())
        } else if name.starts_with('.') {
            Self::Relative(name.to_string())
        } else {
            Self::External(name.to_string())
        }
    }
}

/// Host-side module lookup used for external dependency names.
pub trait HostModuleResolver {
    fn resolve(&self, name: &str) -> Option<Dynamic>;
}

/// Built-in host modules: `os` and `path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdModuleResolver;

impl StdModuleResolver {
    fn os_module() -> Dynamic {
        let eol = if cfg!(windows) { "\r\n" } else { "\n" };
        let mut module = Map::new();
        module.insert("platform".into(), std::env::consts::OS.into());
        module.insert("arch".into(), std::env::consts::ARCH.into());
        module.insert("family".into(), std::env::consts::FAMILY.into());
        module.insert("eol".into(), eol.into());
        module.insert(
            "tmpdir".into(),
            std::env::temp_dir().to_string_lossy().to_string().into(),
        );
        Dynamic::from_map(module)
    }

    fn path_module() -> Dynamic {
        let delimiter = if cfg!(windows) { ";" } else { ":" };
        let mut module = Map::new();
        module.insert(
            "sep".into(),
            std::path::MAIN_SEPARATOR.to_string().into(),
        );
        module.insert("delimiter".into(), delimiter.into());
        Dynamic::from_map(module)
    }
}

impl HostModuleResolver for StdModuleResolver {
    fn resolve(&self, name: &str) -> Option<Dynamic> {
        match name {
            "os" => Some(Self::os_module()),
            "path" => Some(Self::path_module()),
            _ => None,
        }
    }
}

/// Modules registered by the embedding host, with an optional fallback.
#[derive(Default)]
pub struct MapModuleResolver {
    modules: BTreeMap<String, Dynamic>,
    fallback: Option<Box<dyn HostModuleResolver>>,
}

impl MapModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: impl HostModuleResolver + 'static) -> Self {
        Self {
            modules: BTreeMap::new(),
            fallback: Some(Box::new(fallback)),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, module: Dynamic) -> &mut Self {
        self.modules.insert(name.into(), module);
        self
    }
}

impl HostModuleResolver for MapModuleResolver {
    fn resolve(&self, name: &str) -> Option<Dynamic> {
        self.modules.get(name).cloned().or_else(|| {
            self.fallback
                .as_ref()
                .and_then(|fallback| fallback.resolve(name))
        })
    }
}
