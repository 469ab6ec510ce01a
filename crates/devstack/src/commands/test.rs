//! テスト用データベースを作り直してからテストを実行する

use colored::Colorize;
use devstack_config::{DevSettings, TEST_ENV_FILE};
use devstack_container::{CommandRunner, CommandSpec, DatabaseBootstrapper};
use std::path::PathBuf;
use tracing::warn;

/// `test` サブコマンドのオプション
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub path: String,
    pub marker: Option<String>,
    pub verbose: bool,
    pub output_file: Option<PathBuf>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            path: "tests/".into(),
            marker: None,
            verbose: true,
            output_file: None,
        }
    }
}

/// テストランナーのコマンド
pub fn test_command(settings: &DevSettings, options: &TestOptions) -> CommandSpec {
    let mut words = settings.toolchain.test_runner.split_whitespace();
    let program = words.next().unwrap_or("pytest");

    let mut spec = CommandSpec::new(program)
        .args(words)
        .arg(options.path.as_str());
    if options.verbose {
        spec = spec.arg("-v");
    }
    if let Some(marker) = &options.marker {
        spec = spec.arg("-m").arg(marker.as_str());
    }
    spec = spec
        .arg("--tb=short")
        .current_dir(&settings.root)
        .env("DEV_ENV_FILE", TEST_ENV_FILE);

    if let Some(path) = &options.output_file {
        spec = spec.output_file(path);
    }
    spec
}

pub async fn handle(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    options: &TestOptions,
) -> anyhow::Result<()> {
    println!("{}", "🧪 テスト環境を準備しています...".cyan());

    let test_db = settings.database.test_database_name();
    let bootstrapper = DatabaseBootstrapper::connect(runner, settings.database.clone()).await;
    if let Err(e) = bootstrapper.recreate_database(&test_db).await {
        eprintln!("{}", "✗ テスト用データベースを作成できませんでした".red().bold());
        eprintln!("  {}", e);
        anyhow::bail!("テスト用データベース {} の作成に失敗しました", test_db);
    }
    println!(
        "{} テスト用データベース: {}",
        "✓".green(),
        settings.database.masked_dsn_for(&test_db)
    );

    let spec = test_command(settings, options);
    println!("🚀 テストを実行します: {}", spec.to_string().cyan());

    let status = runner.status(&spec).await?;
    if status.success() {
        println!("{}", "✓ すべてのテストが成功しました".green());
    } else {
        warn!("Test runner exited with {:?}", status.code);
        println!(
            "{} テストが失敗しました (exit code: {:?})",
            "⚠".yellow().bold(),
            status.code
        );
    }
    if let Some(path) = &options.output_file {
        println!("  結果: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devstack_config::EnvConfig;
    use devstack_container::CommandOutput;
    use devstack_container::testing::RecordingRunner;
    use std::path::Path;

    fn settings() -> DevSettings {
        DevSettings::from_env(
            Path::new("/srv/app"),
            EnvConfig::parse("POSTGRES_DB=shop\n"),
            PathBuf::from("/srv/app/.env.dev"),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_default_command() {
        let spec = test_command(&settings(), &TestOptions::default());
        assert_eq!(spec.to_string(), "pytest tests/ -v --tb=short");
        assert_eq!(spec.env_value("DEV_ENV_FILE"), Some(".env.test"));
        assert!(spec.output_file.is_none());
    }

    #[test]
    fn test_marker_and_quiet() {
        let options = TestOptions {
            path: "tests/api".into(),
            marker: Some("unit".into()),
            verbose: false,
            output_file: Some(PathBuf::from("report.txt")),
        };
        let spec = test_command(&settings(), &options);
        assert_eq!(spec.to_string(), "pytest tests/api -m unit --tb=short");
        assert_eq!(spec.output_file.as_deref(), Some(Path::new("report.txt")));
    }

    #[tokio::test]
    async fn test_recreates_database_before_running() {
        let runner = RecordingRunner::new();
        runner.respond("which docker", CommandOutput::failure(1, ""));

        handle(&settings(), &runner, &TestOptions::default())
            .await
            .unwrap();

        let lines = runner.command_lines();
        let drop = lines
            .iter()
            .position(|l| l.contains("DROP DATABASE IF EXISTS \"shop_test\""));
        let pytest = lines.iter().position(|l| l.starts_with("pytest"));
        assert!(drop.is_some());
        assert!(drop < pytest);
    }

    #[tokio::test]
    async fn test_database_failure_skips_tests() {
        let runner = RecordingRunner::new();
        runner.respond("which docker", CommandOutput::failure(1, ""));
        runner.respond("psql", CommandOutput::failure(2, "connection refused"));

        assert!(handle(&settings(), &runner, &TestOptions::default()).await.is_err());
        assert!(!runner.was_called("pytest"));
    }

    #[tokio::test]
    async fn test_failing_tests_are_reported_not_propagated() {
        let runner = RecordingRunner::new();
        runner.respond("which docker", CommandOutput::failure(1, ""));
        runner.respond("pytest", CommandOutput::failure(1, ""));

        assert!(handle(&settings(), &runner, &TestOptions::default()).await.is_ok());
    }
}
