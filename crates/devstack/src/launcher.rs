//! Webサーバーの起動

use colored::Colorize;
use devstack_config::{DevSettings, Service};
use devstack_container::{CommandRunner, CommandSpec, find_free_port};

/// サーバーの起動方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// ホットリロード付きの開発サーバー
    Dev,
    /// リバースプロキシの後ろで動かすサーバー
    Serve,
}

/// 使用するポートを決める
///
/// 明示的な指定があればそのまま使い、無ければ `start` から空きを探す。
pub fn resolve_port(explicit: Option<u16>, start: Option<u16>) -> anyhow::Result<u16> {
    match explicit {
        Some(port) => Ok(port),
        None => Ok(find_free_port(
            start.unwrap_or_else(|| Service::Fastapi.default_port()),
        )?),
    }
}

/// サーバーのコマンド
pub fn server_command(
    settings: &DevSettings,
    mode: ServerMode,
    port: u16,
    overrides: &[(String, String)],
) -> CommandSpec {
    let toolchain = &settings.toolchain;
    let spec = CommandSpec::new(toolchain.server.as_str())
        .arg(toolchain.app.as_str())
        .args(["--host", "0.0.0.0", "--port"])
        .arg(port.to_string());

    let spec = match mode {
        ServerMode::Dev => spec.args(["--reload", "--log-level", "debug", "--no-access-log"]),
        ServerMode::Serve => spec.args(["--proxy-headers", "--forwarded-allow-ips=*"]),
    };

    spec.current_dir(&settings.root)
        .envs(overrides.iter().cloned())
}

fn print_banner(port: u16) {
    println!();
    println!("{}", "═".repeat(60));
    println!("{}", "🚀 FastAPI サーバーを起動します".green().bold());
    println!("{}", "═".repeat(60));
    println!("  アドレス:       {}", format!("http://localhost:{}", port).cyan());
    println!("  ドキュメント:   {}", format!("http://localhost:{}/docs", port).cyan());
    println!("  ホットリロード: 有効");
    println!("{}", "═".repeat(60));
    println!();
}

/// サーバーを起動し、終了するまで待つ
pub async fn launch(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    mode: ServerMode,
    port: u16,
    overrides: &[(String, String)],
) -> anyhow::Result<()> {
    match mode {
        ServerMode::Dev => print_banner(port),
        ServerMode::Serve => println!("🚀 ポート {} でサーバーを起動します", port),
    }

    let spec = server_command(settings, mode, port, overrides);
    let status = runner.status(&spec).await?;
    if !status.success() {
        anyhow::bail!(
            "サーバーが異常終了しました (exit code: {:?})",
            status.code
        );
    }
    Ok(())
}
