mod commands;
mod infra;
mod launcher;
mod progress;
mod steps;
mod summary;

use clap::{Parser, Subcommand};
use devstack_config::{DEFAULT_COMPOSE_FILE, DevSettings, find_project_root};
use devstack_container::ProcessRunner;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devstack")]
#[command(about = "コマンドひとつで、開発インフラが立ち上がる。", long_about = None)]
struct Cli {
    /// プロジェクトルート（省略時は compose ファイルを親ディレクトリへ遡って探す）
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// 環境ファイル（省略時は .env.dev → .env.test）
    #[arg(long, global = true, env = "DEVSTACK_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// compose ファイル
    #[arg(long, global = true, default_value = DEFAULT_COMPOSE_FILE)]
    compose_file: PathBuf,

    /// 詳細なログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// インフラを起動して開発サーバーを起動
    Dev {
        /// サーバーのポート（省略時は空いているポートを探す）
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// インフラを起動せずにサーバーを起動
    Serve {
        /// サーバーのポート（省略時は 8000 から空いているポートを探す）
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// マイグレーションを適用してからサーバーを起動
    StartAll,
    /// scripts/setup を実行
    Setup,
    /// scripts/activate を実行
    Activate,
    /// マイグレーションを適用
    Migrate,
    /// black と isort でコードを整形
    Format,
    /// mypy と flake8 で静的チェック
    Check,
    /// 整形してから静的チェック
    Lint,
    /// テスト用データベースを作り直してテストを実行
    Test {
        /// テストのパス
        #[arg(default_value = "tests/")]
        path: String,
        /// pytest のマーカーで絞り込む
        #[arg(short, long)]
        marker: Option<String>,
        /// -v を付けずに実行
        #[arg(short, long)]
        quiet: bool,
        /// テスト結果の出力先ファイル
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("devstack {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let root = match cli.root {
        Some(root) => root,
        None => find_project_root(&std::env::current_dir()?, &cli.compose_file),
    };
    tracing::debug!(root = %root.display(), "Project root");

    let settings = DevSettings::load(&root, cli.env_file.as_deref(), Some(&cli.compose_file))?;
    let runner = ProcessRunner;

    match cli.command {
        Commands::Dev { port } => commands::dev::handle(&settings, &runner, port).await?,
        Commands::Serve { port } => commands::serve::handle(&settings, &runner, port).await?,
        Commands::StartAll => commands::serve::handle_start_all(&settings, &runner).await?,
        Commands::Setup => commands::scripts::handle_setup(&settings, &runner).await?,
        Commands::Activate => commands::scripts::handle_activate(&settings, &runner).await?,
        Commands::Migrate => commands::migrate::handle(&settings, &runner).await?,
        Commands::Format => commands::quality::handle_format(&settings, &runner).await?,
        Commands::Check => commands::quality::handle_check(&settings, &runner).await?,
        Commands::Lint => commands::quality::handle_lint(&settings, &runner).await?,
        Commands::Test {
            path,
            marker,
            quiet,
            output_file,
        } => {
            let options = commands::test::TestOptions {
                path,
                marker,
                verbose: !quiet,
                output_file,
            };
            commands::test::handle(&settings, &runner, &options).await?
        }
        Commands::Version => unreachable!("Version is handled before config loading"),
    }

    Ok(())
}
