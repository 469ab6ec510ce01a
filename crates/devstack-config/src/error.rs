use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "環境ファイルが見つかりません: {0}\n\nヒント:\n  • 必要な環境変数を記述した .env.dev を作成してください\n  • --env-file または DEVSTACK_ENV_FILE で別のファイルを指定できます"
    )]
    EnvFileNotFound(PathBuf),

    #[error(
        "composeファイルが見つかりません: {0}\n\nヒント:\n  • プロジェクトルートで実行しているか確認してください\n  • --compose-file で別のファイルを指定できます"
    )]
    ComposeFileNotFound(PathBuf),

    #[error("{key} の値がポート番号として不正です: '{value}'")]
    InvalidPort { key: String, value: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
