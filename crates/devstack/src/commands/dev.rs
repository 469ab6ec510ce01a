use crate::infra::start_infrastructure;
use crate::launcher::{self, ServerMode};
use devstack_config::{DevSettings, Service};
use devstack_container::CommandRunner;
use tracing::warn;

/// インフラを起動してから開発サーバーを起動する
pub async fn handle(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let Some(report) = start_infrastructure(settings, runner).await else {
        anyhow::bail!("開発インフラの起動に失敗しました");
    };

    if let Some(service) = report.readiness.failed() {
        warn!(
            "{} (port {}) did not become ready, starting the server anyway",
            service.name, service.port
        );
    }
    if !report.database_ready {
        warn!("Database bootstrap did not finish, starting the server anyway");
    }

    let port = launcher::resolve_port(port, report.ports.get(Service::Fastapi))?;
    launcher::launch(
        settings,
        runner,
        ServerMode::Dev,
        port,
        &report.ports.to_env_overrides(),
    )
    .await
}
