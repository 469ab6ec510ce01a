//! 開発インフラの起動シーケンス
//!
//! 設定読み込みからマイグレーションまでを順番に実行する。どのステップも
//! 失敗すればそこで打ち切るが、疎通待機と DB 作成の失敗は警告にとどめて
//! 続行する（マイグレーションで改めて失敗を検出する）。

use crate::commands::migrate;
use crate::progress::Spinner;
use crate::steps::{InfraStep, StepLogger};
use crate::summary;
use colored::Colorize;
use devstack_config::{ConfigError, DevSettings, ReadinessPolicy, Service, ServicePortMap};
use devstack_container::{
    Allocation, BusyPort, CommandRunner, Compose, ComposeTool, ContainerError,
    DatabaseBootstrapper, Docker, ReadinessReport, allocate_ports, busy_ports, check_service,
    check_services,
};
use std::io::IsTerminal;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "次のポートが使用中です:\n{}\n\nヒント:\n  • ポートを使用しているプロセスを停止してください\n  • または環境ファイルでポートを変更してください",
        format_busy(.0)
    )]
    PortsBusy(Vec<BusyPort>),

    #[error(
        "PostgreSQL のポート {port} が使用中です\n\nヒント:\n  • ポート {port} を解放するか、環境ファイルの POSTGRES_PORT を変更してください"
    )]
    DatabasePortBusy { port: u16 },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("マイグレーションに失敗しました (exit code: {code:?})")]
    MigrationFailed { code: Option<i32> },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

fn format_busy(ports: &[BusyPort]) -> String {
    ports
        .iter()
        .map(|busy| format!("  - {}: {}", busy.service, busy.port))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, InfraError>;

/// 起動シーケンスの結果
#[derive(Debug, Clone)]
pub struct InfraReport {
    pub ports: ServicePortMap,
    pub readiness: ReadinessReport,
    pub database_ready: bool,
}

/// 起動シーケンスの実行器
pub struct Infrastructure<'a> {
    settings: &'a DevSettings,
    runner: &'a dyn CommandRunner,
    logger: StepLogger,
    show_spinner: bool,
}

impl<'a> Infrastructure<'a> {
    pub fn new(settings: &'a DevSettings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            settings,
            runner,
            logger: StepLogger::new(),
            show_spinner: true,
        }
    }

    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    pub fn logger(&self) -> &StepLogger {
        &self.logger
    }

    fn complete<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.logger.step_success(None),
            Err(e) => self.logger.step_failed(&e.to_string()),
        }
        result
    }

    /// すべてのステップを順に実行する
    pub async fn start(&mut self) -> Result<InfraReport> {
        println!("{}", "🚀 開発インフラを起動します".green().bold());

        self.logger.start_step(InfraStep::LoadConfig);
        let result = self.load_config();
        self.complete(result)?;

        self.logger.start_step(InfraStep::ValidatePorts);
        let result = self.validate_ports();
        self.complete(result)?;

        self.logger.start_step(InfraStep::ValidateDaemon);
        let result = self.validate_daemon().await;
        self.complete(result)?;

        let tool = ComposeTool::detect(self.runner).await;
        debug!("Compose tool: {}", tool.display_name());

        self.logger.start_step(InfraStep::ResetContainers);
        let result = self.reset_containers(tool).await;
        self.complete(result)?;

        self.logger.start_step(InfraStep::AllocatePorts);
        let result = self.allocate_ports();
        let ports = self.complete(result)?;

        self.logger.start_step(InfraStep::StartContainers);
        let result = self.start_containers(tool, &ports).await;
        self.complete(result)?;

        self.logger.start_step(InfraStep::AwaitReadiness);
        let readiness = self.await_readiness(&ports).await;

        let bootstrapper = DatabaseBootstrapper::connect(
            self.runner,
            self.settings.database.clone().with_port(ports.port_or_default(Service::Postgres)),
        )
        .await;

        self.logger.start_step(InfraStep::Diagnostics);
        self.diagnostics(&bootstrapper).await;

        self.logger.start_step(InfraStep::BootstrapDatabase);
        let database_ready = self.bootstrap_database(&bootstrapper).await;

        self.logger.start_step(InfraStep::Migrate);
        let result = migrate::run(self.settings, self.runner, &ports.to_env_overrides()).await;
        self.complete(result)?;

        self.logger.start_step(InfraStep::ReportSummary);
        summary::print(self.settings, &ports);
        self.logger.step_success(None);

        Ok(InfraReport {
            ports,
            readiness,
            database_ready,
        })
    }

    fn load_config(&mut self) -> Result<()> {
        let compose_path = self.settings.compose_path();
        if !compose_path.exists() {
            return Err(ConfigError::ComposeFileNotFound(compose_path).into());
        }
        if !self.settings.env_file.exists() {
            return Err(ConfigError::EnvFileNotFound(self.settings.env_file.clone()).into());
        }

        let message = format!(
            "{} から {} 件の設定を読み込みました",
            self.settings.env_file.display(),
            self.settings.env.len()
        );
        self.logger.step_success(Some(&message));
        Ok(())
    }

    /// 設定されたインフラ用ポートをまとめて確認する
    fn validate_ports(&mut self) -> Result<()> {
        let configured = Service::infrastructure()
            .map(|service| Ok((service, self.settings.configured_port(service)?)))
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        let busy = busy_ports(configured);
        if !busy.is_empty() {
            return Err(InfraError::PortsBusy(busy));
        }
        Ok(())
    }

    async fn validate_daemon(&mut self) -> Result<()> {
        Docker::new(self.runner).check_daemon().await?;
        self.logger.step_success(Some("Docker は起動しています"));
        Ok(())
    }

    async fn reset_containers(&mut self, tool: ComposeTool) -> Result<()> {
        let docker = Docker::new(self.runner);
        let running = docker.running_containers().await?;
        if !running.is_empty() {
            self.logger.log_detail("起動中のコンテナ:");
            for name in &running {
                self.logger.log_detail(&format!("  - {}", name));
            }
        }

        Compose::new(self.runner, tool, self.settings).down().await?;
        docker.prune_volumes().await?;
        Ok(())
    }

    /// PostgreSQL は設定値のまま、それ以外は空いているポートを割り当てる
    fn allocate_ports(&mut self) -> Result<ServicePortMap> {
        let preferred = Service::ALL
            .into_iter()
            .map(|service| Ok((service, self.settings.configured_port(service)?)))
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        match allocate_ports(preferred, &[Service::Postgres])? {
            Allocation::Assigned(ports) => {
                for (service, port) in ports.iter() {
                    self.logger.log_detail(&format!("{}: {}", service, port));
                }
                Ok(ports)
            }
            Allocation::FixedPortBusy(busy) => Err(InfraError::DatabasePortBusy { port: busy.port }),
        }
    }

    async fn start_containers(&mut self, tool: ComposeTool, ports: &ServicePortMap) -> Result<()> {
        let spinner = if self.show_spinner {
            Spinner::new("コンテナを起動しています...")
        } else {
            Spinner::hidden()
        };

        let result = Compose::new(self.runner, tool, self.settings).up(ports).await;
        spinner.finish();
        result?;

        self.logger.step_success(Some("コンテナを起動しました"));
        Ok(())
    }

    /// 応答しないサービスがあっても続行する
    async fn await_readiness(&mut self, ports: &ServicePortMap) -> ReadinessReport {
        let report = check_services(&self.settings.probe_host, &self.settings.readiness, ports).await;

        match report.failed() {
            None => self.logger.step_success(Some("すべてのサービスが応答しました")),
            Some(failed) => self.logger.step_warning(&format!(
                "{} がポート {} で応答しません（続行します）",
                failed.name, failed.port
            )),
        }
        report
    }

    /// 環境ファイルと実際の DB 接続先を表示する
    async fn diagnostics(&mut self, bootstrapper: &DatabaseBootstrapper<'_>) {
        const KEYS: [&str; 5] = [
            "POSTGRES_USER",
            "POSTGRES_PASSWORD",
            "POSTGRES_HOST",
            "POSTGRES_PORT",
            "POSTGRES_DB",
        ];

        self.logger.log_detail("環境ファイルの値:");
        for key in KEYS {
            let value = match self.settings.env.get(key) {
                Some(v) if key.contains("PASSWORD") => "*".repeat(v.len()),
                Some(v) => v.to_string(),
                None => "(未設定)".to_string(),
            };
            self.logger.log_detail(&format!("  {}: {}", key, value));
        }

        let db = bootstrapper.settings();
        self.logger.log_detail(&format!("接続先: {}", db.masked_dsn()));
        self.logger
            .log_detail(&format!("接続経路: {}", bootstrapper.channel()));

        let published = bootstrapper.published_port().await;
        let reachable = check_service(
            "PostgreSQL",
            &self.settings.probe_host,
            published,
            ReadinessPolicy::new(1, Duration::ZERO),
        )
        .await;

        let message = if reachable {
            format!("PostgreSQL は {}:{} で接続できます", self.settings.probe_host, published)
        } else {
            format!("PostgreSQL に {}:{} で接続できません", self.settings.probe_host, published)
        };
        self.logger.step_success(Some(&message));
    }

    async fn bootstrap_database(&mut self, bootstrapper: &DatabaseBootstrapper<'_>) -> bool {
        let ready = bootstrapper.create_database().await;
        if ready {
            let message = format!(
                "データベースを確認しました: {}",
                bootstrapper.settings().masked_dsn()
            );
            self.logger.step_success(Some(&message));
        } else {
            self.logger
                .step_warning("データベースを作成できませんでした（続行します）");
        }
        ready
    }
}

/// 失敗の原因と対処方法を表示する
pub fn report_failure(error: &InfraError) {
    eprintln!();
    eprintln!("{}", "✗ 開発インフラを起動できませんでした".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    for line in error.to_string().lines() {
        eprintln!("  {}", line);
    }
}

/// 起動シーケンスを実行し、失敗した場合は原因を表示する
///
/// 成功時のみ結果を返す。
pub async fn start_infrastructure(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
) -> Option<InfraReport> {
    let mut infra =
        Infrastructure::new(settings, runner).with_spinner(std::io::stdout().is_terminal());
    let result = infra.start().await;
    infra.logger().print_summary();

    match result {
        Ok(report) => Some(report),
        Err(e) => {
            report_failure(&e);
            None
        }
    }
}
