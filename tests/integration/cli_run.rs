//! The `autogame` binary against a host without a desktop backend.

use std::path::Path;
use std::process::{Command, Output};

fn autogame(config: &Path, data: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_autogame"))
        .arg("--config")
        .arg(config)
        .arg("--data-dir")
        .arg(data)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn run_refuses_without_a_desktop_and_keeps_tasks_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let data = dir.path().join("data");
    assert!(autogame(&config, &data, &["config", "init"]).status.success());
    assert!(
        autogame(&config, &data, &["tasks", "add", "Daily gift", "--category", "gift"])
            .status
            .success()
    );
    assert!(
        autogame(&config, &data, &["accounts", "add", "main", "--window", "LDPlayer"])
            .status
            .success()
    );
    let tasks_before = std::fs::read(data.join("tasks.json")).unwrap();

    for args in [&["run", "--once"][..], &["run"][..]] {
        let output = autogame(&config, &data, args);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("no desktop backend"), "{stderr}");
    }
    assert_eq!(std::fs::read(data.join("tasks.json")).unwrap(), tasks_before);
}
