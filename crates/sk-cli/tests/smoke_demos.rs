use std::process::Command;

use sk_test_example::{demo_entry, demo_expectations, demo_names};

#[test]
fn run_matches_expectations_for_all_demos() {
    let bin = env!("CARGO_BIN_EXE_sk-cli");
    let names = demo_names();
    assert!(!names.is_empty(), "expected scriptlet demos");

    for name in names {
        let output = Command::new(bin)
            .arg("run")
            .arg("--script")
            .arg(demo_entry(&name))
            .arg("--cache")
            .arg("mtime")
            .output()
            .expect("cli should execute");
        let stdout = String::from_utf8_lossy(&output.stdout);

        for expected in demo_expectations(&name) {
            assert!(
                stdout.lines().any(|line| line == expected),
                "demo {} missing line {:?}\nstdout:\n{}\nstderr:\n{}",
                name,
                expected,
                stdout,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let failed = stdout.lines().any(|line| line == "RESULT:ERROR");
        assert_eq!(output.status.success(), !failed, "demo {} exit status", name);
    }
}

#[test]
fn inspect_prints_declared_dependencies() {
    let output = Command::new(env!("CARGO_BIN_EXE_sk-cli"))
        .arg("inspect")
        .arg("--script")
        .arg(demo_entry("07-load-bindings"))
        .output()
        .expect("cli should execute");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout:\n{}", stdout);
    assert!(stdout.lines().any(|line| line == "DEP_JSON:\"$load\""));
    assert!(stdout.lines().any(|line| line == "FACTORY:fn"));
}
