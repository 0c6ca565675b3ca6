use assert_cmd::Command;
use predicates::prelude::*;

fn glm_migrate() -> Command {
    let mut cmd = Command::cargo_bin("glm-migrate").unwrap();
    cmd.env_remove("GLM_S3__BUCKET").env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_body_without_attachments_passes_through() {
    glm_migrate()
        .write_stdin("Nothing to see [here](https://example.com/uploads/a.png)\n")
        .assert()
        .success()
        .stdout("Nothing to see [here](https://example.com/uploads/a.png)\n");
}

#[test]
fn test_reads_input_file_and_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("issue.md");
    let output = dir.path().join("out.md");
    std::fs::write(&input, "# Issue\n\nno links\n").unwrap();

    glm_migrate()
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Issue\n\nno links\n");
}

#[test]
fn test_missing_config_file_fails() {
    glm_migrate()
        .arg("--config")
        .arg("/nonexistent/settings.toml")
        .write_stdin("body")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_missing_input_file_fails() {
    glm_migrate()
        .arg("/nonexistent/issue.md")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
