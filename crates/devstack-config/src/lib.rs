pub mod env;
pub mod error;
pub mod service;
pub mod settings;

pub use env::*;
pub use error::*;
pub use service::*;
pub use settings::*;

use std::path::{Path, PathBuf};

/// プロジェクトルートを探す
///
/// 以下の優先順位で決定する:
/// 1. 環境変数 DEVSTACK_ROOT (直接パス指定)
/// 2. `start` から親ディレクトリへ遡り、compose ファイルか .env.dev を含む最初のディレクトリ
/// 3. `start` そのもの
pub fn find_project_root(start: &Path, compose_file: &Path) -> PathBuf {
    // 1. 環境変数で直接指定
    if let Ok(root) = std::env::var("DEVSTACK_ROOT") {
        let path = PathBuf::from(root);
        if path.is_dir() {
            return path;
        }
    }

    // 2. 親ディレクトリへ遡って検索
    for dir in start.ancestors() {
        if dir.join(compose_file).exists() || dir.join(DEV_ENV_FILE).exists() {
            return dir.to_path_buf();
        }
    }

    // 3. 見つからなければ開始位置
    start.to_path_buf()
}
