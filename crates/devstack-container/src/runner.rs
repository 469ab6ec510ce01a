//! 外部コマンド実行の抽象化
//!
//! docker / compose / psql / マイグレーションツールなどの呼び出しはすべて
//! [`CommandRunner`] を経由する。

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// 実行するコマンド
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// 追加の環境変数（後に指定したものが優先）
    pub envs: Vec<(String, String)>,
    /// 標準出力・標準エラーの書き出し先（`status` のみ）
    pub output_file: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn output_file(mut self, path: impl AsRef<Path>) -> Self {
        self.output_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// 最後に設定された値（環境変数の確認用）
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// 終了コード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 出力をキャプチャした実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// エラー分類用に stderr と stdout を連結したもの
    pub fn diagnostic_text(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stderr, self.stdout)
        }
    }
}

/// 外部コマンドの実行
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 出力をキャプチャして実行
    async fn output(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;

    /// 標準入出力を引き継いで実行し、終了を待つ
    async fn status(&self, spec: &CommandSpec) -> std::io::Result<CommandStatus>;
}

/// `tokio::process` による実装
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn output(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        debug!("Running: {}", spec);

        let output = Self::command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn status(&self, spec: &CommandSpec) -> std::io::Result<CommandStatus> {
        debug!("Running (attached): {}", spec);

        let mut cmd = Self::command(spec);
        if let Some(path) = &spec.output_file {
            let file = std::fs::File::create(path)?;
            let stderr = file.try_clone()?;
            cmd.stdout(file).stderr(stderr);
        }

        let status = cmd.status().await?;
        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

/// コマンドがPATH上に存在するか
pub async fn is_available(runner: &dyn CommandRunner, program: &str) -> bool {
    let locator = if cfg!(windows) { "where" } else { "which" };
    runner
        .output(&CommandSpec::new(locator).arg(program))
        .await
        .map(|out| out.is_success())
        .unwrap_or(false)
}
