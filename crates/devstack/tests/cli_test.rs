#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

fn devstack() -> Command {
    let mut cmd = Command::cargo_bin("devstack").unwrap();
    cmd.env_remove("DEVSTACK_ROOT")
        .env_remove("DEVSTACK_ENV_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    devstack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("開発インフラが立ち上がる"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("start-all"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("lint"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    devstack()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("devstack"));
}

/// testコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_test_help() {
    devstack()
        .arg("test")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[PATH]"))
        .stdout(predicate::str::contains("--marker"))
        .stdout(predicate::str::contains("--output-file"));
}

/// devコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_dev_help() {
    devstack()
        .arg("dev")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    devstack().arg("invalid-command").assert().failure();
}

/// 不正なポート指定でエラーになることを確認
#[test]
fn test_invalid_port_argument() {
    devstack().args(["serve", "--port", "70000"]).assert().failure();
}

/// 環境ファイルが無いとDockerに触れる前に失敗することを確認
#[test]
fn test_dev_without_env_file() {
    let project = TestProject::new();
    project.write_compose("services: {}\n");

    devstack()
        .current_dir(project.path())
        .arg("dev")
        .assert()
        .failure()
        .stderr(predicate::str::contains("開発インフラを起動できませんでした"))
        .stderr(predicate::str::contains(".env.dev"));
}

/// composeファイルが無いと失敗することを確認
#[test]
fn test_dev_without_compose_file() {
    let project = TestProject::new();
    project.write_env(".env.dev", "POSTGRES_DB=shop\n");

    devstack()
        .arg("--root")
        .arg(project.path())
        .arg("dev")
        .assert()
        .failure()
        .stderr(predicate::str::contains("docker-compose.dev.yml"));
}

/// 環境ファイルの値がポート番号として不正な場合
#[test]
fn test_invalid_port_in_env_file() {
    let project = TestProject::new();
    project.write_compose("services: {}\n");
    project.write_env(".env.dev", "POSTGRES_PORT=not-a-port\n");

    devstack()
        .current_dir(project.path())
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("POSTGRES_PORT"));
}

/// マイグレーションコマンドは環境ファイルで差し替えられる
#[cfg(unix)]
#[test]
fn test_migrate_uses_configured_command() {
    let project = TestProject::new();
    project.write_env(".env.dev", "DEVSTACK_MIGRATE_CMD=true\n");

    devstack()
        .current_dir(project.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("マイグレーション完了"));
}

/// --env-file で指定したファイルが優先される
#[cfg(unix)]
#[test]
fn test_env_file_flag_takes_priority() {
    let project = TestProject::new();
    project.write_env(".env.dev", "DEVSTACK_MIGRATE_CMD=true\n");
    project.write_env(".env.ci", "DEVSTACK_MIGRATE_CMD=false\n");

    devstack()
        .current_dir(project.path())
        .args(["--env-file", ".env.ci", "migrate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("マイグレーションに失敗しました"));
}
