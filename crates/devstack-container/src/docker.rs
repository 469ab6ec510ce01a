//! docker CLI の呼び出し

use crate::error::{ContainerError, Result, translate_failure};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec, is_available};
use serde::Deserialize;
use tracing::{debug, warn};

/// 失敗した実行結果をエラーに変換する
pub(crate) fn ensure_success(program: &str, output: CommandOutput) -> Result<CommandOutput> {
    if output.is_success() {
        return Ok(output);
    }

    let text = output.diagnostic_text();
    Err(translate_failure(&text).unwrap_or_else(|| ContainerError::CommandFailed {
        program: program.to_string(),
        code: output.code,
        stderr: output.stderr.trim().to_string(),
    }))
}

/// `docker ps --format {{json .}}` の1行
#[derive(Debug, Clone, Deserialize)]
pub struct PsEntry {
    #[serde(rename = "Names")]
    pub names: String,

    #[serde(rename = "State", default)]
    pub state: Option<String>,

    #[serde(rename = "Ports", default)]
    pub ports: String,
}

/// docker CLI ラッパー
pub struct Docker<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Docker<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self
            .runner
            .output(&CommandSpec::new("docker").args(args.iter().copied()))
            .await?;
        ensure_success("docker", output)
    }

    /// docker コマンドがインストールされているか
    pub async fn is_installed(&self) -> bool {
        is_available(self.runner, "docker").await
    }

    /// デーモンが応答するか確認する（`docker info`）
    pub async fn check_daemon(&self) -> Result<()> {
        let output = self.runner.output(&CommandSpec::new("docker").arg("info")).await?;
        if output.is_success() {
            return Ok(());
        }

        let text = output.diagnostic_text();
        debug!("docker info failed: {}", text.trim());
        if text.to_lowercase().contains("permission denied") {
            Err(ContainerError::DaemonPermissionDenied)
        } else {
            Err(ContainerError::DaemonNotRunning)
        }
    }

    /// 起動中のコンテナ名
    pub async fn running_containers(&self) -> Result<Vec<String>> {
        let output = self.run(&["ps", "--format", "{{.Names}}"]).await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// 使われていないボリュームを削除する
    pub async fn prune_volumes(&self) -> Result<()> {
        self.run(&["volume", "prune", "-f"]).await?;
        Ok(())
    }

    /// 名前でフィルタしたコンテナ一覧
    pub async fn find_containers(&self, name_filter: &str) -> Result<Vec<PsEntry>> {
        let filter = format!("name={}", name_filter);
        let output = self
            .run(&["ps", "--filter", &filter, "--format", "{{json .}}"])
            .await?;

        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<PsEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Unexpected docker ps output: {} ({})", line, e);
                    None
                }
            })
            .collect())
    }

    /// コンテナのポートが公開されているホスト側ポート（`docker port`）
    ///
    /// 出力例: `0.0.0.0:5433` / `[::]:5433`
    pub async fn published_port(&self, container: &str, container_port: u16) -> Result<Option<u16>> {
        let port = container_port.to_string();
        let output = self.run(&["port", container, &port]).await?;
        Ok(parse_published_port(&output.stdout))
    }
}

fn parse_published_port(stdout: &str) -> Option<u16> {
    stdout
        .lines()
        .filter_map(|line| line.trim().rsplit(':').next())
        .find_map(|port| port.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;

    #[test]
    fn test_parse_published_port() {
        assert_eq!(parse_published_port("0.0.0.0:5433\n[::]:5433\n"), Some(5433));
        assert_eq!(parse_published_port(""), None);
        assert_eq!(parse_published_port("garbage"), None);
    }

    #[tokio::test]
    async fn test_check_daemon_classification() {
        let runner = RecordingRunner::new();
        runner.respond_once(
            "docker info",
            CommandOutput::failure(1, "permission denied while trying to connect"),
        );
        runner.respond_once(
            "docker info",
            CommandOutput::failure(1, "Cannot connect to the Docker daemon"),
        );

        let docker = Docker::new(&runner);
        assert!(matches!(
            docker.check_daemon().await,
            Err(ContainerError::DaemonPermissionDenied)
        ));
        assert!(matches!(
            docker.check_daemon().await,
            Err(ContainerError::DaemonNotRunning)
        ));
        assert!(docker.check_daemon().await.is_ok());
    }

    #[tokio::test]
    async fn test_find_containers_parses_json_lines() {
        let runner = RecordingRunner::new();
        runner.respond(
            "docker ps --filter name=postgres",
            CommandOutput::success(
                "{\"Names\":\"myapp-postgres-1\",\"State\":\"running\",\"Ports\":\"0.0.0.0:5432->5432/tcp\"}\nnot-json\n",
            ),
        );

        let entries = Docker::new(&runner).find_containers("postgres").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].names, "myapp-postgres-1");
        assert_eq!(entries[0].state.as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn test_prune_volumes_translates_daemon_error() {
        let runner = RecordingRunner::new();
        runner.respond(
            "docker volume prune",
            CommandOutput::failure(1, "error during connect: open //./pipe/docker_engine"),
        );

        let result = Docker::new(&runner).prune_volumes().await;
        assert!(matches!(result, Err(ContainerError::DaemonNotRunning)));
    }

    #[tokio::test]
    async fn test_running_containers() {
        let runner = RecordingRunner::new();
        runner.respond(
            "docker ps --format",
            CommandOutput::success("web_1\n\nredis_1\n"),
        );
        let names = Docker::new(&runner).running_containers().await.unwrap();
        assert_eq!(names, vec!["web_1", "redis_1"]);
    }
}
