mod cache;
mod helpers;
mod loader;
mod loop_tracker;
mod resolver;
mod sandbox;
mod storage;

pub use cache::{ArtifactCache, CacheLookup, CompiledArtifact};
pub use helpers::paths::{absolute_path, sibling_path};
pub use helpers::rhai_bridge::{dynamic_to_skvalue, skvalue_to_dynamic};
pub use loader::{LoadOptions, ScriptletLoader, ScriptletLoaderOptions, LOAD_FN_NAME};
pub use loop_tracker::LoopTracker;
pub use resolver::{DependencyToken, HostModuleResolver, MapModuleResolver, StdModuleResolver};
pub use sandbox::{Definition, Sandbox};
pub use storage::{FsStorage, MemoryStorage, ScriptletStorage};
