use crate::commands::migrate;
use crate::launcher::{self, ServerMode};
use devstack_config::DevSettings;
use devstack_container::CommandRunner;

/// インフラを起動せずにサーバーだけを起動する
pub async fn handle(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let port = launcher::resolve_port(port, None)?;
    launcher::launch(settings, runner, ServerMode::Serve, port, &[]).await
}

/// マイグレーションを適用してからサーバーを起動する
pub async fn handle_start_all(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
) -> anyhow::Result<()> {
    migrate::run(settings, runner, &[]).await?;
    handle(settings, runner, None).await
}
