use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use rhai::AST;
use sk_core::{CachePolicy, CacheStats, ScriptletError};
use tracing::debug;

use crate::storage::ScriptletStorage;

#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub path: PathBuf,
    pub last_modified: SystemTime,
    pub compiled: AST,
}

#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Rc<CompiledArtifact>),
    /// `modified` carries the modification time read while validating, if any.
    Miss { modified: Option<SystemTime> },
}

/// Compiled scriptlets keyed by absolute path. Entries are superseded, never evicted.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: HashMap<PathBuf, Rc<CompiledArtifact>>,
    stats: CacheStats,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(
        &mut self,
        path: &Path,
        policy: CachePolicy,
        storage: &dyn ScriptletStorage,
    ) -> Result<CacheLookup, ScriptletError> {
        let cached = match policy {
            CachePolicy::None => None,
            CachePolicy::Full | CachePolicy::Mtime => self.entries.get(path).cloned(),
        };
        let Some(artifact) = cached else {
            return Ok(self.miss(path, policy, None));
        };

        if policy == CachePolicy::Mtime {
            let modified = storage.modified(path)?;
            if modified != artifact.last_modified {
                return Ok(self.miss(path, policy, Some(modified)));
            }
        }

        self.stats.hits += 1;
        debug!(path = %path.display(), %policy, "scriptlet cache hit");
        Ok(CacheLookup::Hit(artifact))
    }

    pub fn store(
        &mut self,
        path: PathBuf,
        last_modified: SystemTime,
        compiled: AST,
    ) -> Rc<CompiledArtifact> {
        let artifact = Rc::new(CompiledArtifact {
            path: path.clone(),
            last_modified,
            compiled,
        });
        self.stats.compiles += 1;
        self.entries.insert(path, Rc::clone(&artifact));
        artifact
    }

    pub fn get(&self, path: &Path) -> Option<Rc<CompiledArtifact>> {
        self.entries.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = self.entries.keys().cloned().collect::<Vec<_>>();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    fn miss(
        &mut self,
        path: &Path,
        policy: CachePolicy,
        modified: Option<SystemTime>,
    ) -> CacheLookup {
        self.stats.misses += 1;
        debug!(path = %path.display(), %policy, stale = modified.is_some(), "scriptlet cache miss");
        CacheLookup::Miss { modified }
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::time::{Duration, UNIX_EPOCH};

    fn ast(source: &str) -> AST {
        rhai::Engine::new().compile(source).expect("compile")
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn disabled_policy_never_hits_but_still_records() {
        let storage = MemoryStorage::new();
        let path = PathBuf::from("/c/a.rhai");
        storage.insert(&path, "1", at(1));
        let mut cache = ArtifactCache::new();
        cache.store(path.clone(), at(1), ast("1"));

        let lookup = cache.lookup(&path, CachePolicy::None, &storage).expect("lookup");
        assert!(matches!(lookup, CacheLookup::Miss { modified: None }));
        assert!(cache.get(&path).is_some());
        assert_eq!(storage.metadata_reads(), 0);
    }

    #[test]
    fn full_policy_reuses_without_stat() {
        let storage = MemoryStorage::new();
        let path = PathBuf::from("/c/a.rhai");
        storage.insert(&path, "1", at(5));
        let mut cache = ArtifactCache::new();
        cache.store(path.clone(), at(1), ast("1"));

        let lookup = cache.lookup(&path, CachePolicy::Full, &storage).expect("lookup");
        assert!(matches!(lookup, CacheLookup::Hit(_)));
        assert_eq!(storage.metadata_reads(), 0);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn mtime_policy_compares_exact_equality() {
        let storage = MemoryStorage::new();
        let path = PathBuf::from("/c/a.rhai");
        storage.insert(&path, "1", at(5));
        let mut cache = ArtifactCache::new();
        cache.store(path.clone(), at(5), ast("1"));

        let hit = cache.lookup(&path, CachePolicy::Mtime, &storage).expect("hit");
        assert!(matches!(hit, CacheLookup::Hit(_)));
        assert_eq!(storage.metadata_reads(), 1);

        // an older timestamp counts as a change too
        storage.touch(&path, at(3));
        let stale = cache.lookup(&path, CachePolicy::Mtime, &storage).expect("stale");
        match stale {
            CacheLookup::Miss { modified } => assert_eq!(modified, Some(at(3))),
            CacheLookup::Hit(_) => panic!("older mtime must invalidate"),
        }
        assert_eq!(storage.metadata_reads(), 2);
    }

    #[test]
    fn mtime_policy_without_entry_skips_stat() {
        let storage = MemoryStorage::new();
        let mut cache = ArtifactCache::new();
        let lookup = cache
            .lookup(Path::new("/c/none.rhai"), CachePolicy::Mtime, &storage)
            .expect("lookup");
        assert!(matches!(lookup, CacheLookup::Miss { modified: None }));
        assert_eq!(storage.metadata_reads(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn store_supersedes_and_clear_resets() {
        let mut cache = ArtifactCache::new();
        let path = PathBuf::from("/c/a.rhai");
        cache.store(path.clone(), at(1), ast("1"));
        let second = cache.store(path.clone(), at(2), ast("2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&path).expect("entry").last_modified, at(2));
        assert_eq!(second.path, path);
        assert_eq!(cache.stats().compiles, 2);
        assert_eq!(cache.paths(), vec![path]);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
