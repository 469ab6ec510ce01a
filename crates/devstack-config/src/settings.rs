//! 起動処理の各ステップに引き回す設定
//!
//! 割り当てたポートなどはプロセスの環境変数に書き戻さず、この構造体と
//! [`crate::ServicePortMap`] で明示的に受け渡す。

use crate::env::{DEV_ENV_FILE, EnvConfig, load_env};
use crate::error::Result;
use crate::service::Service;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// デフォルトの compose ファイル
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.dev.yml";
/// データベース名のデフォルト
pub const DEFAULT_DATABASE_NAME: &str = "app_db";

/// 疎通確認のリトライ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl ReadinessPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(3))
    }
}

/// 疎通確認の対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTarget {
    pub name: String,
    pub service: Service,
    pub policy: ReadinessPolicy,
}

impl ReadinessTarget {
    pub fn new(name: impl Into<String>, service: Service, policy: ReadinessPolicy) -> Self {
        Self {
            name: name.into(),
            service,
            policy,
        }
    }
}

/// Redis → RabbitMQ → PostgreSQL の順に確認する
///
/// PostgreSQL は起動が最も遅いのでリトライ回数を最大にする。
pub fn default_readiness_targets() -> Vec<ReadinessTarget> {
    let delay = Duration::from_secs(3);
    vec![
        ReadinessTarget::new("Redis", Service::Redis, ReadinessPolicy::new(5, delay)),
        ReadinessTarget::new(
            "RabbitMQ",
            Service::RabbitmqUi,
            ReadinessPolicy::new(20, delay),
        ),
        ReadinessTarget::new(
            "PostgreSQL",
            Service::Postgres,
            ReadinessPolicy::new(30, delay),
        ),
    ]
}

/// PostgreSQL の接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl DatabaseSettings {
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        Ok(Self {
            user: env.get_or("POSTGRES_USER", "postgres").to_string(),
            password: env.get_or("POSTGRES_PASSWORD", "").to_string(),
            host: env.get_or("POSTGRES_HOST", "localhost").to_string(),
            port: Service::Postgres.configured_port(env)?,
            name: env.get_or("POSTGRES_DB", DEFAULT_DATABASE_NAME).to_string(),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// パスワードを伏せた接続文字列
    pub fn masked_dsn(&self) -> String {
        self.masked_dsn_for(&self.name)
    }

    pub fn masked_dsn_for(&self, database: &str) -> String {
        format!(
            "postgresql://{}:*******@{}:{}/{}",
            self.user, self.host, self.port, database
        )
    }

    /// pytest 用のデータベース名
    pub fn test_database_name(&self) -> String {
        format!("{}_test", self.name)
    }
}

/// 外部ツールのコマンド
///
/// 環境ファイルの `DEVSTACK_*` キーで上書きできる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// マイグレーション（デフォルト: `alembic upgrade head`）
    pub migrate: Vec<String>,
    /// Webサーバー（デフォルト: `uvicorn`）
    pub server: String,
    /// Webサーバーに渡すアプリケーション
    pub app: String,
    /// フォーマッタ・チェッカーの対象
    pub source_dir: String,
    pub test_runner: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            migrate: vec!["alembic".into(), "upgrade".into(), "head".into()],
            server: "uvicorn".into(),
            app: "app.main:app".into(),
            source_dir: "app/".into(),
            test_runner: "pytest".into(),
        }
    }
}

impl Toolchain {
    pub fn from_env(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        let migrate = env
            .get("DEVSTACK_MIGRATE_CMD")
            .map(|cmd| cmd.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty())
            .unwrap_or(defaults.migrate);

        Self {
            migrate,
            server: env.get_or("DEVSTACK_SERVER_CMD", &defaults.server).to_string(),
            app: env.get_or("DEVSTACK_APP", &defaults.app).to_string(),
            source_dir: env
                .get_or("DEVSTACK_SOURCE_DIR", &defaults.source_dir)
                .to_string(),
            test_runner: env
                .get_or("DEVSTACK_TEST_CMD", &defaults.test_runner)
                .to_string(),
        }
    }
}

/// 開発スタック全体の設定
#[derive(Debug, Clone)]
pub struct DevSettings {
    /// プロジェクトルート
    pub root: PathBuf,
    /// compose ファイル（ルートからの相対パス）
    pub compose_file: PathBuf,
    /// compose 実行時に必須の環境ファイル
    pub env_file: PathBuf,
    pub env: EnvConfig,
    pub database: DatabaseSettings,
    pub readiness: Vec<ReadinessTarget>,
    pub toolchain: Toolchain,
    /// 疎通確認に使うホスト
    pub probe_host: String,
}

impl DevSettings {
    /// 環境ファイルを読み込んで設定を組み立てる
    ///
    /// `env_file` を省略した場合は `.env.dev` → `.env.test` の順に探す。
    /// どちらも無くてもエラーにはしない。
    pub fn load(root: &Path, env_file: Option<&Path>, compose_file: Option<&Path>) -> Result<Self> {
        let env = load_env(root, env_file);
        let required_env_file = match env_file {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => root.join(p),
            None => root.join(DEV_ENV_FILE),
        };
        Self::from_env(root, env, required_env_file, compose_file)
    }

    pub fn from_env(
        root: &Path,
        env: EnvConfig,
        env_file: PathBuf,
        compose_file: Option<&Path>,
    ) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            compose_file: compose_file
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSE_FILE)),
            env_file,
            database: DatabaseSettings::from_env(&env)?,
            toolchain: Toolchain::from_env(&env),
            readiness: default_readiness_targets(),
            probe_host: "localhost".to_string(),
            env,
        })
    }

    /// compose ファイルの絶対パス
    pub fn compose_path(&self) -> PathBuf {
        self.root.join(&self.compose_file)
    }

    /// 環境ファイルの値、無ければデフォルトのポート
    pub fn configured_port(&self, service: Service) -> Result<u16> {
        service.configured_port(&self.env)
    }

    /// 環境ファイルの値を文字列で取得（サマリー表示用）
    pub fn value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.env.get_or(key, default)
    }
}
