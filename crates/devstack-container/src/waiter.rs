//! 依存サービスの疎通待機モジュール
//!
//! 各サービスに TCP 接続を試み、固定間隔でリトライする。
//! 複数サービスは1つずつ順番に確認し、最初に待ちきれなかったサービスで打ち切る。

use devstack_config::{ReadinessPolicy, ReadinessTarget, ServicePortMap};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// 1回の接続試行のタイムアウト
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// サービスが TCP 接続を受け付けるまで待機
///
/// # Arguments
/// * `name` - ログ用のサービス名
/// * `host` - 接続先ホスト
/// * `port` - 接続先ポート
/// * `policy` - リトライ回数と間隔
///
/// # Returns
/// 接続できたら `true`、`policy.retries` 回失敗したら `false`
pub async fn check_service(name: &str, host: &str, port: u16, policy: ReadinessPolicy) -> bool {
    for attempt in 0..policy.retries {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {
                debug!(service = name, port, attempt, "Service is ready");
                return true;
            }
            Ok(Err(e)) => {
                debug!(service = name, port, error = %e, "Connection refused");
            }
            Err(_) => {
                debug!(service = name, port, "Connection attempt timed out");
            }
        }

        warn!(
            "Waiting for {} on port {} ({}/{})",
            name,
            port,
            attempt + 1,
            policy.retries
        );

        // 最後の試行でなければ待機
        if attempt + 1 < policy.retries {
            sleep(policy.delay).await;
        }
    }

    warn!(service = name, port, "Service did not become ready");
    false
}

/// サービスごとの確認結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReadiness {
    pub name: String,
    pub port: u16,
    pub ready: bool,
}

/// 全体の確認結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessReport {
    pub services: Vec<ServiceReadiness>,
}

impl ReadinessReport {
    /// 確認したサービスがすべて応答したか
    pub fn all_ready(&self) -> bool {
        self.services.iter().all(|s| s.ready)
    }

    /// 待ちきれなかったサービス
    pub fn failed(&self) -> Option<&ServiceReadiness> {
        self.services.iter().find(|s| !s.ready)
    }
}

/// 複数サービスを順番に確認する
///
/// 応答しないサービスがあった時点で残りは確認しない。
pub async fn check_services(
    host: &str,
    targets: &[ReadinessTarget],
    ports: &ServicePortMap,
) -> ReadinessReport {
    let mut report = ReadinessReport::default();

    for target in targets {
        let port = ports.port_or_default(target.service);
        let ready = check_service(&target.name, host, port, target.policy).await;
        report.services.push(ServiceReadiness {
            name: target.name.clone(),
            port,
            ready,
        });
        if !ready {
            break;
        }
    }

    report
}
