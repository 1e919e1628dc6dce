use std::fs;
use std::path::PathBuf;

pub const DEMO_ENTRY: &str = "main.rhai";
pub const DEMO_EXPECT: &str = "expect.txt";

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn demos_root() -> PathBuf {
    workspace_root().join("demos").join("scriptlets")
}

pub fn demo_dir(name: &str) -> PathBuf {
    demos_root().join(name)
}

pub fn demo_entry(name: &str) -> PathBuf {
    demo_dir(name).join(DEMO_ENTRY)
}

/// Demo directories in name order.
pub fn demo_names() -> Vec<String> {
    let mut names = fs::read_dir(demos_root())
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Non-empty lines of the demo's `expect.txt`.
pub fn demo_expectations(name: &str) -> Vec<String> {
    fs::read_to_string(demo_dir(name).join(DEMO_EXPECT))
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
