use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sk_core::ScriptletError;

/// Paths entered by one top-level `run`. Clones share the same set, and
/// entries stay until the whole invocation tree is dropped.
#[derive(Debug, Clone, Default)]
pub struct LoopTracker {
    in_flight: Rc<RefCell<BTreeSet<PathBuf>>>,
}

impl LoopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self, path: &Path) -> Result<(), ScriptletError> {
        if !self.in_flight.borrow_mut().insert(path.to_path_buf()) {
            return Err(ScriptletError::dependency_loop(path.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod loop_tracker_tests {
    use super::*;
    use sk_core::DEPENDENCY_LOOP;

    #[test]
    fn second_entry_of_same_path_fails() {
        let tracker = LoopTracker::new();
        tracker.enter(Path::new("/a.rhai")).expect("first entry");
        tracker.enter(Path::new("/b.rhai")).expect("other path");
        let error = tracker
            .enter(Path::new("/a.rhai"))
            .expect_err("re-entry should fail");
        assert_eq!(error.code, DEPENDENCY_LOOP);
        assert!(error.message.contains("/a.rhai"));
    }

    #[test]
    fn clones_share_one_set() {
        let tracker = LoopTracker::new();
        let branch = tracker.clone();
        branch.enter(Path::new("/x.rhai")).expect("enter");
        let error = tracker
            .enter(Path::new("/x.rhai"))
            .expect_err("entry through a clone should be visible");
        assert_eq!(error.code, DEPENDENCY_LOOP);
        LoopTracker::new()
            .enter(Path::new("/x.rhai"))
            .expect("fresh tracker has its own set");
    }
}
