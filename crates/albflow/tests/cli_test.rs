#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = r#"
provider:
  region: us-east-1
load_balancers:
  web:
    name: web-alb
    subnets: [subnet-a, subnet-b]
    idle_timeout: 120
  api:
    name: api-alb
    internal: true
    subnets: [subnet-c]
    access_logs:
      - bucket: alb-logs
        prefix: api
"#;

/// 外部の設定やAWS環境に影響されない alb コマンド
fn alb(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ALB_CONFIG_PATH")
        .env_remove("ALB_REGION")
        .env_remove("AWS_PROFILE")
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("AWS_EC2_METADATA_DISABLED", "true");
    cmd
}

fn project_with(manifest: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("alb.yaml"), manifest).unwrap();
    dir
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Application Load Balancer"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("import"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("albflow"));
}

#[test]
fn test_apply_help() {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    cmd.arg("apply")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--file"));
}

#[test]
fn test_import_requires_arn() {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    cmd.arg("import").arg("web").assert().failure();
}

#[test]
fn test_validate_valid_manifest() {
    let dir = project_with(MANIFEST);

    alb(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("マニフェストは正常です"))
        .stdout(predicate::str::contains("ALB: 2個"))
        .stdout(predicate::str::contains("web-alb"))
        .stdout(predicate::str::contains("internal"));
}

#[test]
fn test_validate_invalid_manifest() {
    let dir = project_with(
        r#"
load_balancers:
  web:
    name: -web
    subnets: [subnet-a]
  api:
    name: api
    subnets: [subnet-a]
    access_logs:
      - bucket: one
      - bucket: two
"#,
    );

    alb(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定エラー"))
        .stderr(predicate::str::contains("hyphen"))
        .stderr(predicate::str::contains("at most one access_logs block"));
}

#[test]
fn test_validate_with_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.yaml");
    fs::write(&path, MANIFEST).unwrap();

    alb(&dir)
        .arg("-f")
        .arg(&path)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.yaml"));
}

#[test]
fn test_manifest_not_found() {
    let dir = tempfile::tempdir().unwrap();

    alb(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("マニフェストが見つかりません"));
}

#[test]
fn test_plan_without_state_creates_everything() {
    let dir = project_with(MANIFEST);

    alb(&dir)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 to create"))
        .stdout(predicate::str::contains("alb apply --yes"));

    // plan は状態ファイルを書かない
    assert!(!dir.path().join(".albflow").join("state.json").exists());
}

#[test]
fn test_apply_without_yes_does_not_change_anything() {
    let dir = project_with(MANIFEST);

    alb(&dir)
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));

    assert!(!dir.path().join(".albflow").exists());
}

#[test]
fn test_destroy_with_empty_state() {
    let dir = project_with(MANIFEST);

    alb(&dir)
        .arg("destroy")
        .assert()
        .success()
        .stdout(predicate::str::contains("削除対象の ALB はありません"));
}

#[test]
fn test_show_unmanaged() {
    let dir = project_with(MANIFEST);

    alb(&dir)
        .arg("show")
        .arg("web")
        .assert()
        .failure()
        .stderr(predicate::str::contains("管理対象ではありません"));
}
