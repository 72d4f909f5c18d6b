use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn install(root: &std::path::Path) -> std::path::PathBuf {
    let app = root.join("app");
    fs::create_dir_all(app.join("dist")).unwrap();
    fs::write(
        app.join("dist/main.js"),
        r#"fetch("https://huggingface.co/api/models");"#,
    )
    .unwrap();
    app
}

#[test]
fn json_mode_keeps_stdout_machine_readable() {
    let temp_dir = TempDir::new().unwrap();
    let app = install(temp_dir.path());

    let mut command = cargo_bin_cmd!("lms-mirror");
    command
        .args(["--yes", "--no-backup", "--json", "--path"])
        .arg(&app)
        .env("HOME", temp_dir.path())
        .env("NO_COLOR", "1")
        .env_remove("LMS_MIRROR_LOG");

    let assert = command
        .assert()
        .success()
        .stderr(contains("Using LM Studio directory"))
        .stderr(contains("Replaced 1 occurrence(s)"));

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)
        .expect("stdout should hold only the JSON summary");
    assert_eq!(report["outcome"], "replaced");
    assert_eq!(report["replacements"], 1);
    assert_eq!(report["code_replacements"], 1);
    assert!(report["backup_dir"].is_null());
    assert_eq!(
        fs::read_to_string(app.join("dist/main.js")).unwrap(),
        r#"fetch("https://hf-mirror.com/api/models");"#
    );
}

#[test]
fn missing_path_exits_with_failure() {
    let temp_dir = TempDir::new().unwrap();

    let mut command = cargo_bin_cmd!("lms-mirror");
    command
        .args(["--yes", "--json", "--path"])
        .arg(temp_dir.path().join("missing"))
        .env("HOME", temp_dir.path())
        .env("NO_COLOR", "1");

    command
        .assert()
        .code(1)
        .stdout("")
        .stderr(contains("does not exist"));
}
