use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::{Dynamic, Engine, FnPtr, ImmutableString, Map};
use sk_core::{CachePolicy, CacheStats, ScriptletError, SCRIPTLET_EVAL};
use tracing::debug;

use crate::cache::{ArtifactCache, CacheLookup, CompiledArtifact};
use crate::helpers::paths::{absolute_path, sibling_path};
use crate::helpers::rhai_bridge::into_eval_error;
use crate::loop_tracker::LoopTracker;
use crate::resolver::{DependencyToken, HostModuleResolver, StdModuleResolver};
use crate::sandbox::{Definition, Sandbox};
use crate::storage::{FsStorage, ScriptletStorage};

/// Name of the host function behind the `$load` dependency.
pub const LOAD_FN_NAME: &str = "load_scriptlet";

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub extra_bindings: BTreeMap<String, Dynamic>,
    pub cache_policy: CachePolicy,
    loop_tracker: Option<LoopTracker>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: Dynamic) -> Self {
        self.extra_bindings.insert(name.into(), value);
        self
    }

    pub fn loop_tracker(&self) -> Option<&LoopTracker> {
        self.loop_tracker.as_ref()
    }

    /// Options for a nested load: bindings are copied and merged (child keys
    /// win), the loop tracker is shared.
    pub fn child(&self, bindings: Option<&BTreeMap<String, Dynamic>>) -> Self {
        let mut extra_bindings = self.extra_bindings.clone();
        if let Some(bindings) = bindings {
            extra_bindings.extend(
                bindings
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
        Self {
            extra_bindings,
            cache_policy: self.cache_policy,
            loop_tracker: self.loop_tracker.clone(),
        }
    }
}

pub struct ScriptletLoaderOptions {
    pub storage: Box<dyn ScriptletStorage>,
    pub resolver: Box<dyn HostModuleResolver>,
}

impl Default for ScriptletLoaderOptions {
    fn default() -> Self {
        Self {
            storage: Box::new(FsStorage),
            resolver: Box::new(StdModuleResolver),
        }
    }
}

struct LoaderState {
    sandbox: Sandbox,
    cache: RefCell<ArtifactCache>,
    storage: Box<dyn ScriptletStorage>,
    resolver: Box<dyn HostModuleResolver>,
}

/// Cached, dependency-resolving scriptlet loader. Clones share the sandbox
/// and the artifact cache.
#[derive(Clone)]
pub struct ScriptletLoader {
    state: Rc<LoaderState>,
}

/// Curried into the `$load` function pointer handed to factories.
#[derive(Clone)]
struct LoadHandle {
    loader: ScriptletLoader,
    directory: PathBuf,
    options: LoadOptions,
}

impl LoadHandle {
    fn load(&self, name: &str, bindings: Option<Map>) -> Result<Dynamic, ScriptletError> {
        let bindings = bindings.map(|map| {
            map.into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect::<BTreeMap<_, _>>()
        });
        let options = self.options.child(bindings.as_ref());
        self.loader
            .run_path(sibling_path(&self.directory, name), options)
    }
}

fn register_load_fn(engine: &mut Engine) {
    engine.register_type_with_name::<LoadHandle>("LoadHandle");
    engine.register_fn(LOAD_FN_NAME, |handle: LoadHandle, name: ImmutableString| {
        handle.load(&name, None).map_err(into_eval_error)
    });
    engine.register_fn(
        LOAD_FN_NAME,
        |handle: LoadHandle, name: ImmutableString, bindings: Map| {
            handle.load(&name, Some(bindings)).map_err(into_eval_error)
        },
    );
}

impl ScriptletLoader {
    pub fn new(options: ScriptletLoaderOptions) -> Self {
        Self {
            state: Rc::new(LoaderState {
                sandbox: Sandbox::with_extensions(register_load_fn),
                cache: RefCell::new(ArtifactCache::new()),
                storage: options.storage,
                resolver: options.resolver,
            }),
        }
    }

    pub fn with_storage(storage: impl ScriptletStorage + 'static) -> Self {
        Self::new(ScriptletLoaderOptions {
            storage: Box::new(storage),
            ..ScriptletLoaderOptions::default()
        })
    }

    /// Loads the scriptlet at `reference` and returns its factory's result.
    pub fn run(
        &self,
        reference: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<Dynamic, ScriptletError> {
        let path = absolute_path(reference.as_ref())?;
        self.run_path(path, options)
    }

    /// Evaluates `define` without resolving dependencies or calling the factory.
    pub fn inspect(
        &self,
        reference: impl AsRef<Path>,
        cache_policy: CachePolicy,
    ) -> Result<Definition, ScriptletError> {
        let path = absolute_path(reference.as_ref())?;
        let artifact = self.load_artifact(&path, cache_policy)?;
        self.state.sandbox.evaluate(&artifact)
    }

    /// Compiles (and caches) the scriptlet without evaluating it.
    pub fn compile(&self, reference: impl AsRef<Path>) -> Result<(), ScriptletError> {
        let path = absolute_path(reference.as_ref())?;
        self.load_artifact(&path, CachePolicy::None).map(|_| ())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.cache.borrow().stats()
    }

    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.state.cache.borrow().paths()
    }

    pub fn clear_cache(&self) {
        self.state.cache.borrow_mut().clear();
    }

    fn run_path(&self, path: PathBuf, mut options: LoadOptions) -> Result<Dynamic, ScriptletError> {
        options
            .loop_tracker
            .get_or_insert_with(LoopTracker::new)
            .enter(&path)?;

        let artifact = self.load_artifact(&path, options.cache_policy)?;
        let definition = self.state.sandbox.evaluate(&artifact)?;

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut args = Vec::with_capacity(definition.dependencies.len());
        for name in &definition.dependencies {
            args.push(self.resolve_dependency(name, &path, &directory, &options)?);
        }

        self.state
            .sandbox
            .invoke(&artifact, definition.factory, args)
    }

    fn resolve_dependency(
        &self,
        name: &str,
        path: &Path,
        directory: &Path,
        options: &LoadOptions,
    ) -> Result<Dynamic, ScriptletError> {
        let token = DependencyToken::classify(name, &options.extra_bindings);
        debug!(from = %path.display(), dependency = name, ?token, "resolving dependency");
        match token {
            DependencyToken::Loader => {
                let mut load = FnPtr::new(LOAD_FN_NAME).map_err(|error| {
                    ScriptletError::new(SCRIPTLET_EVAL, error.to_string())
                })?;
                load.add_curry(Dynamic::from(LoadHandle {
                    loader: self.clone(),
                    directory: directory.to_path_buf(),
                    options: options.clone(),
                }));
                Ok(Dynamic::from(load))
            }
            DependencyToken::Binding(name) => options
                .extra_bindings
                .get(&name)
                .cloned()
                .ok_or_else(|| ScriptletError::dependency_missing(&name, path.display())),
            DependencyToken::Relative(name) => {
                self.run_path(sibling_path(directory, &name), options.child(None))
            }
            DependencyToken::External(name) => self
                .state
                .resolver
                .resolve(&name)
                .ok_or_else(|| ScriptletError::dependency_missing(&name, path.display())),
        }
    }

    /// Cache lookup, then stat + read + compile + store on a miss. The stat
    /// happens under every policy, `None` included, so a missing file reports
    /// `STORAGE_METADATA` before any read is attempted.
    fn load_artifact(
        &self,
        path: &Path,
        cache_policy: CachePolicy,
    ) -> Result<Rc<CompiledArtifact>, ScriptletError> {
        let lookup =
            self.state
                .cache
                .borrow_mut()
                .lookup(path, cache_policy, self.state.storage.as_ref())?;
        let modified = match lookup {
            CacheLookup::Hit(artifact) => return Ok(artifact),
            CacheLookup::Miss { modified } => modified,
        };

        let last_modified = match modified {
            Some(modified) => modified,
            None => self.state.storage.modified(path)?,
        };
        let source = self.state.storage.read(path)?;
        let compiled = self.state.sandbox.compile(path, &source)?;
        debug!(path = %path.display(), %cache_policy, "scriptlet compiled");
        Ok(self
            .state
            .cache
            .borrow_mut()
            .store(path.to_path_buf(), last_modified, compiled))
    }
}

impl Default for ScriptletLoader {
    fn default() -> Self {
        Self::new(ScriptletLoaderOptions::default())
    }
}
