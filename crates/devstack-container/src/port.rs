use crate::error::{ContainerError, Result};
use devstack_config::{Service, ServicePortMap};
use std::net::{Ipv4Addr, TcpListener};
use tracing::{debug, info};

/// ポートが bind 可能か確認する
///
/// 全インターフェースに bind を試み、成功したら即座に解放する。
/// 予約はしないので、確認後に他のプロセスに取られる可能性はある。
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
}

/// `start` から順に空いているポートを探す
pub fn find_free_port(start: u16) -> Result<u16> {
    let port = (start.max(1)..=u16::MAX)
        .find(|port| is_port_free(*port))
        .ok_or(ContainerError::NoFreePort { start })?;

    if port != start {
        debug!("Port {} is busy, using {}", start, port);
    }
    Ok(port)
}

/// 使用中のポート
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyPort {
    pub service: Service,
    pub port: u16,
}

/// 指定したポートのうち使用中のものをすべて返す
pub fn busy_ports<I>(ports: I) -> Vec<BusyPort>
where
    I: IntoIterator<Item = (Service, u16)>,
{
    ports
        .into_iter()
        .filter(|(_, port)| !is_port_free(*port))
        .map(|(service, port)| BusyPort { service, port })
        .collect()
}

/// 各サービスのポートを割り当てる
///
/// `fixed` に含まれるサービスは設定値のまま使い、使用中なら
/// [`Allocation::FixedPortBusy`] を返す。それ以外は設定値から順に空きポートを探す。
/// 固定ポートを先に確保するので、同じ実行内で同じポートを2度割り当てることはない。
pub fn allocate_ports<I>(preferred: I, fixed: &[Service]) -> Result<Allocation>
where
    I: IntoIterator<Item = (Service, u16)>,
{
    let preferred: Vec<(Service, u16)> = preferred.into_iter().collect();
    let mut ports = ServicePortMap::new();

    for &(service, port) in preferred.iter().filter(|(s, _)| fixed.contains(s)) {
        if !is_port_free(port) {
            return Ok(Allocation::FixedPortBusy(BusyPort { service, port }));
        }
        ports.insert(service, port);
    }

    for &(service, port) in preferred.iter().filter(|(s, _)| !fixed.contains(s)) {
        let mut candidate = port;
        let assigned = loop {
            let found = find_free_port(candidate)?;
            if !ports.iter().any(|(_, taken)| taken == found) {
                break found;
            }
            candidate = found
                .checked_add(1)
                .ok_or(ContainerError::NoFreePort { start: port })?;
        };

        if assigned != port {
            info!(service = %service, "Port {} is busy, reassigned to {}", port, assigned);
        }
        ports.insert(service, assigned);
    }
    Ok(Allocation::Assigned(ports))
}

/// ポート割り当ての結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Assigned(ServicePortMap),
    /// 自動で振り替えないサービスのポートが使用中
    FixedPortBusy(BusyPort),
}
