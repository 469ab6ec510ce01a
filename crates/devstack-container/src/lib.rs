//! devstack のコンテナ・ネットワーク周り
//!
//! ポートの確認と割り当て、依存サービスの疎通待機、compose スタックの操作、
//! PostgreSQL データベースの作成を提供する。外部コマンドはすべて
//! [`CommandRunner`] 経由で実行する。

pub mod compose;
pub mod database;
pub mod docker;
pub mod error;
pub mod port;
pub mod runner;
pub mod waiter;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use compose::*;
pub use database::*;
pub use docker::*;
pub use error::*;
pub use port::*;
pub use runner::*;
pub use waiter::*;
