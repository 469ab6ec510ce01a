//! プロジェクト付属のシェルスクリプトの実行

use colored::Colorize;
use devstack_config::DevSettings;
use devstack_container::{CommandRunner, CommandSpec};

/// `scripts/<name>.sh`（Windows では `scripts/<name>.ps1`）を実行するコマンド
pub fn script_command(settings: &DevSettings, name: &str) -> CommandSpec {
    let spec = if cfg!(windows) {
        CommandSpec::new("powershell")
            .arg("-File")
            .arg(format!("scripts/{}.ps1", name))
    } else {
        CommandSpec::new("bash").arg(format!("scripts/{}.sh", name))
    };
    spec.current_dir(&settings.root)
}

async fn run_script(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    name: &str,
) -> anyhow::Result<()> {
    let spec = script_command(settings, name);
    println!("▶ {}", spec.to_string().cyan());

    let status = runner.status(&spec).await?;
    if !status.success() {
        anyhow::bail!(
            "{} が失敗しました (exit code: {:?})",
            spec,
            status.code
        );
    }
    Ok(())
}

/// 開発環境のセットアップ
pub async fn handle_setup(settings: &DevSettings, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    run_script(settings, runner, "setup").await
}

/// 仮想環境の有効化
pub async fn handle_activate(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
) -> anyhow::Result<()> {
    run_script(settings, runner, "activate").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use devstack_config::EnvConfig;
    use devstack_container::CommandOutput;
    use devstack_container::testing::RecordingRunner;
    use std::path::{Path, PathBuf};

    fn settings() -> DevSettings {
        DevSettings::from_env(
            Path::new("/srv/app"),
            EnvConfig::empty(),
            PathBuf::from("/srv/app/.env.dev"),
            None,
        )
        .unwrap()
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_setup_runs_shell_script() {
        let runner = RecordingRunner::new();
        handle_setup(&settings(), &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].to_string(), "bash scripts/setup.sh");
        assert_eq!(calls[0].cwd.as_deref(), Some(Path::new("/srv/app")));
    }

    #[tokio::test]
    async fn test_activate_failure_is_error() {
        let runner = RecordingRunner::new();
        runner.respond("activate", CommandOutput::failure(1, ""));
        assert!(handle_activate(&settings(), &runner).await.is_err());
    }
}
