use crate::infra::{InfraError, Result};
use colored::Colorize;
use devstack_config::DevSettings;
use devstack_container::{CommandRunner, CommandSpec};

/// マイグレーションのコマンド
pub fn command(settings: &DevSettings, overrides: &[(String, String)]) -> Option<CommandSpec> {
    let (program, args) = settings.toolchain.migrate.split_first()?;
    Some(
        CommandSpec::new(program.as_str())
            .args(args.iter().map(String::as_str))
            .current_dir(&settings.root)
            .envs(overrides.iter().cloned()),
    )
}

/// マイグレーションを実行する
///
/// 終了コードが 0 以外なら [`InfraError::MigrationFailed`]。
pub async fn run(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    overrides: &[(String, String)],
) -> Result<()> {
    let spec = command(settings, overrides).ok_or(InfraError::MigrationFailed { code: None })?;
    println!("📦 {}", spec.to_string().cyan());

    let status = runner.status(&spec).await?;
    if !status.success() {
        return Err(InfraError::MigrationFailed { code: status.code });
    }
    Ok(())
}

pub async fn handle(settings: &DevSettings, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    run(settings, runner, &[]).await?;
    println!("{}", "✓ マイグレーション完了".green());
    Ok(())
}
