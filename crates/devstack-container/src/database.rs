//! PostgreSQL データベースの作成
//!
//! 起動中の PostgreSQL コンテナがあれば `docker exec` で、無ければホストの
//! `psql` で直接接続してカタログを確認し、必要ならデータベースを作成する。

use crate::docker::{Docker, ensure_success};
use crate::error::Result;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use devstack_config::DatabaseSettings;
use std::fmt;
use tracing::{debug, info, warn};

/// コンテナ側の PostgreSQL ポート
pub const POSTGRES_CONTAINER_PORT: u16 = 5432;

/// 管理用に接続するデータベース
const MAINTENANCE_DATABASE: &str = "postgres";

/// psql の接続経路
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseChannel {
    /// コンテナ内で psql を実行
    Container(String),
    /// ホストの psql で直接接続
    Direct,
}

impl fmt::Display for DatabaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseChannel::Container(name) => write!(f, "container {}", name),
            DatabaseChannel::Direct => f.write_str("direct connection"),
        }
    }
}

/// 起動中の PostgreSQL コンテナを探す
///
/// docker が無い、コンテナが見つからない、問い合わせに失敗した場合は
/// いずれも [`DatabaseChannel::Direct`] を返す。
pub async fn resolve_channel(runner: &dyn CommandRunner) -> DatabaseChannel {
    let docker = Docker::new(runner);
    if !docker.is_installed().await {
        info!("docker not found, connecting to PostgreSQL directly");
        return DatabaseChannel::Direct;
    }

    match docker.find_containers("postgres").await {
        Ok(entries) => match entries.into_iter().next() {
            Some(entry) => DatabaseChannel::Container(entry.names),
            None => {
                warn!("No running PostgreSQL container, connecting directly");
                DatabaseChannel::Direct
            }
        },
        Err(e) => {
            warn!("Failed to look up PostgreSQL container: {}", e);
            DatabaseChannel::Direct
        }
    }
}

/// SQL 識別子として引用符で囲む
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL 文字列リテラルとして引用符で囲む
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// データベース作成の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyExists,
}

pub struct DatabaseBootstrapper<'a> {
    runner: &'a dyn CommandRunner,
    settings: DatabaseSettings,
    channel: DatabaseChannel,
}

impl<'a> DatabaseBootstrapper<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        settings: DatabaseSettings,
        channel: DatabaseChannel,
    ) -> Self {
        Self {
            runner,
            settings,
            channel,
        }
    }

    /// 接続経路を解決して作成する
    pub async fn connect(runner: &'a dyn CommandRunner, settings: DatabaseSettings) -> Self {
        let channel = resolve_channel(runner).await;
        debug!("Using PostgreSQL via {}", channel);
        Self::new(runner, settings, channel)
    }

    pub fn channel(&self) -> &DatabaseChannel {
        &self.channel
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    fn psql(&self, sql: &str) -> CommandSpec {
        let db = &self.settings;
        let spec = match &self.channel {
            DatabaseChannel::Container(container) => {
                let mut spec = CommandSpec::new("docker").args(["exec", "-i"]);
                if !db.password.is_empty() {
                    // 値は docker exec が自身の環境から引き継ぐ
                    spec = spec
                        .args(["-e", "PGPASSWORD"])
                        .env("PGPASSWORD", db.password.as_str());
                }
                spec.arg(container.as_str()).args(["psql", "-U", db.user.as_str()])
            }
            DatabaseChannel::Direct => {
                let mut spec = CommandSpec::new("psql")
                    .args(["-U", db.user.as_str(), "-h", db.host.as_str(), "-p"])
                    .arg(db.port.to_string());
                if !db.password.is_empty() {
                    spec = spec.env("PGPASSWORD", db.password.as_str());
                }
                spec
            }
        };
        spec.args(["-d", MAINTENANCE_DATABASE, "-tAc", sql])
    }

    async fn execute(&self, sql: &str) -> Result<CommandOutput> {
        let spec = self.psql(sql);
        let program = spec.program.clone();
        let output = self.runner.output(&spec).await?;
        ensure_success(&program, output)
    }

    /// データベースが存在するか
    pub async fn database_exists(&self, name: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM pg_database WHERE datname = {}",
            quote_literal(name)
        );
        let output = self.execute(&sql).await?;
        Ok(output.stdout.trim() == "1")
    }

    /// データベースが無ければ作成する
    pub async fn ensure_database(&self, name: &str) -> Result<BootstrapOutcome> {
        if self.database_exists(name).await? {
            debug!("Database {} already exists", name);
            return Ok(BootstrapOutcome::AlreadyExists);
        }

        info!("Creating database {}", name);
        self.execute(&format!("CREATE DATABASE {}", quote_ident(name)))
            .await?;
        Ok(BootstrapOutcome::Created)
    }

    /// 設定されたデータベースを用意する
    ///
    /// 失敗してもエラーにはせず `false` を返す。
    pub async fn create_database(&self) -> bool {
        let name = self.settings.name.clone();
        match self.ensure_database(&name).await {
            Ok(outcome) => {
                debug!(?outcome, "Database bootstrap finished");
                true
            }
            Err(e) => {
                warn!("Failed to bootstrap database {}: {}", name, e);
                false
            }
        }
    }

    /// 削除してから作り直す（テスト用データベース向け）
    pub async fn recreate_database(&self, name: &str) -> Result<()> {
        info!("Recreating database {}", name);
        self.execute(&format!("DROP DATABASE IF EXISTS {}", quote_ident(name)))
            .await?;
        self.execute(&format!("CREATE DATABASE {}", quote_ident(name)))
            .await?;
        Ok(())
    }

    /// コンテナが公開している PostgreSQL のホスト側ポート
    ///
    /// 直接接続の場合や取得できない場合は設定値を返す。
    pub async fn published_port(&self) -> u16 {
        let DatabaseChannel::Container(container) = &self.channel else {
            return self.settings.port;
        };

        match Docker::new(self.runner)
            .published_port(container, POSTGRES_CONTAINER_PORT)
            .await
        {
            Ok(Some(port)) => port,
            Ok(None) => self.settings.port,
            Err(e) => {
                warn!("Failed to read published PostgreSQL port: {}", e);
                self.settings.port
            }
        }
    }
}
