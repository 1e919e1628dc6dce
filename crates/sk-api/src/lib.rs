use std::collections::BTreeMap;
use std::path::Path;

use rhai::Dynamic;
use sk_core::{CachePolicy, CacheStats, ScriptletError, SkValue};
use sk_runtime::{dynamic_to_skvalue, skvalue_to_dynamic, LoadOptions, ScriptletLoader};

thread_local! {
    static DEFAULT_LOADER: ScriptletLoader = ScriptletLoader::default();
}

#[derive(Debug, Clone, Default)]
pub struct RunScriptletOptions {
    pub bindings: BTreeMap<String, SkValue>,
    pub cache_policy: CachePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptletSummary {
    pub dependencies: Vec<String>,
    pub invocable: bool,
}

/// Runs a scriptlet on this thread's shared loader.
pub fn run(reference: impl AsRef<Path>, options: LoadOptions) -> Result<Dynamic, ScriptletError> {
    DEFAULT_LOADER.with(|loader| loader.run(reference, options))
}

/// Like [`run`], with plain-data bindings and result.
pub fn run_scriptlet(
    reference: impl AsRef<Path>,
    options: RunScriptletOptions,
) -> Result<SkValue, ScriptletError> {
    run_scriptlet_with(&default_loader(), reference, options)
}

pub fn run_scriptlet_with(
    loader: &ScriptletLoader,
    reference: impl AsRef<Path>,
    options: RunScriptletOptions,
) -> Result<SkValue, ScriptletError> {
    let mut load_options = LoadOptions::new().with_cache_policy(options.cache_policy);
    for (name, value) in &options.bindings {
        load_options = load_options.with_binding(name.clone(), skvalue_to_dynamic(value));
    }
    let value = loader.run(reference, load_options)?;
    dynamic_to_skvalue(value)
}

pub fn inspect_scriptlet(
    reference: impl AsRef<Path>,
    cache_policy: CachePolicy,
) -> Result<ScriptletSummary, ScriptletError> {
    let definition = default_loader().inspect(reference, cache_policy)?;
    Ok(ScriptletSummary {
        invocable: definition.is_invocable(),
        dependencies: definition.dependencies,
    })
}

pub fn check_scriptlet(reference: impl AsRef<Path>) -> Result<(), ScriptletError> {
    default_loader().compile(reference)
}

pub fn default_loader() -> ScriptletLoader {
    DEFAULT_LOADER.with(ScriptletLoader::clone)
}

pub fn default_cache_stats() -> CacheStats {
    DEFAULT_LOADER.with(ScriptletLoader::cache_stats)
}
