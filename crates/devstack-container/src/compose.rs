//! docker compose ラッパー

use crate::docker::ensure_success;
use crate::error::{ContainerError, Result};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec, is_available};
use devstack_config::{DevSettings, ServicePortMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// compose コマンドの呼び出し方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTool {
    /// `docker-compose`
    Standalone,
    /// `docker compose`
    Plugin,
}

impl ComposeTool {
    /// `docker-compose` があればそれを使い、無ければ `docker compose`
    pub async fn detect(runner: &dyn CommandRunner) -> Self {
        if is_available(runner, "docker-compose").await {
            debug!("Using standalone docker-compose");
            ComposeTool::Standalone
        } else {
            debug!("Using docker compose plugin");
            ComposeTool::Plugin
        }
    }

    fn command(&self) -> CommandSpec {
        match self {
            ComposeTool::Standalone => CommandSpec::new("docker-compose"),
            ComposeTool::Plugin => CommandSpec::new("docker").arg("compose"),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComposeTool::Standalone => "docker-compose",
            ComposeTool::Plugin => "docker compose",
        }
    }
}

/// compose スタックの操作
pub struct Compose<'a> {
    runner: &'a dyn CommandRunner,
    tool: ComposeTool,
    root: PathBuf,
    compose_file: PathBuf,
    env_file: PathBuf,
    env: Vec<(String, String)>,
}

impl<'a> Compose<'a> {
    pub fn new(runner: &'a dyn CommandRunner, tool: ComposeTool, settings: &DevSettings) -> Self {
        Self {
            runner,
            tool,
            root: settings.root.clone(),
            compose_file: settings.compose_path(),
            env_file: settings.env_file.clone(),
            env: settings
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn tool(&self) -> ComposeTool {
        self.tool
    }

    /// compose ファイルと環境ファイルの存在確認
    pub fn validate_files(&self) -> Result<()> {
        for path in [&self.compose_file, &self.env_file] {
            if !path.exists() {
                return Err(ContainerError::MissingFile(path.clone()));
            }
        }
        Ok(())
    }

    /// compose コマンドを実行する
    ///
    /// 子プロセスの環境変数は、プロセスの環境 → 環境ファイル → `overrides`
    /// の順に上書きされる。失敗時は出力を分類して返す。
    pub async fn run(&self, command: &[&str], overrides: &[(String, String)]) -> Result<CommandOutput> {
        self.validate_files()?;

        let spec = self
            .tool
            .command()
            .arg("-f")
            .arg(self.compose_file.to_string_lossy())
            .args(command.iter().copied())
            .current_dir(&self.root)
            .envs(self.env.iter().cloned())
            .envs(overrides.iter().cloned());

        let output = self.runner.output(&spec).await?;
        if !output.is_success() {
            warn!(
                "{} {} failed:\n{}",
                self.tool.display_name(),
                command.join(" "),
                output.stderr.trim()
            );
        }
        ensure_success(self.tool.display_name(), output)
    }

    /// 既存のスタックを停止・削除する
    pub async fn down(&self) -> Result<()> {
        info!("Stopping existing compose stack");
        self.run(&["down", "--remove-orphans"], &[]).await?;
        Ok(())
    }

    /// 割り当てたポートを環境変数として渡してスタックを起動する
    pub async fn up(&self, ports: &ServicePortMap) -> Result<CommandOutput> {
        info!("Starting compose stack");
        self.run(&["up", "-d"], &ports.to_env_overrides()).await
    }
}
