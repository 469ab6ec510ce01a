//! 開発スタックを構成するサービスとポート表

use crate::env::EnvConfig;
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt;

/// 開発スタックのサービス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
    /// アプリケーション（Webサーバー）
    Fastapi,
    /// RabbitMQ (AMQP)
    Rabbitmq,
    /// RabbitMQ 管理画面
    RabbitmqUi,
    Postgres,
    Redis,
    Pgadmin,
    RedisCommander,
}

impl Service {
    pub const ALL: [Service; 7] = [
        Service::Fastapi,
        Service::Rabbitmq,
        Service::RabbitmqUi,
        Service::Postgres,
        Service::Redis,
        Service::Pgadmin,
        Service::RedisCommander,
    ];

    /// 環境変数・ポート表で使う名前
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fastapi => "FASTAPI",
            Self::Rabbitmq => "RABBITMQ",
            Self::RabbitmqUi => "RABBITMQ_UI",
            Self::Postgres => "POSTGRES",
            Self::Redis => "REDIS",
            Self::Pgadmin => "PGADMIN",
            Self::RedisCommander => "REDIS_COMMANDER",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Fastapi => 8000,
            Self::Rabbitmq => 5672,
            Self::RabbitmqUi => 15672,
            Self::Postgres => 5432,
            Self::Redis => 6379,
            Self::Pgadmin => 5050,
            Self::RedisCommander => 8081,
        }
    }

    /// ポートを指定する環境変数名（例: `REDIS_PORT`）
    pub fn port_key(&self) -> String {
        format!("{}_PORT", self.name())
    }

    /// アプリケーション以外の依存サービスか
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::Fastapi)
    }

    pub fn infrastructure() -> impl Iterator<Item = Service> {
        Self::ALL.into_iter().filter(Service::is_infrastructure)
    }

    /// 環境ファイルの値、無ければデフォルトのポート
    pub fn configured_port(&self, env: &EnvConfig) -> Result<u16> {
        env.port(&self.port_key(), self.default_port())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 1回の起動で割り当てたサービスごとのポート
///
/// 割り当て時点で bind 可能だったことだけを保証する（予約はしない）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePortMap {
    ports: BTreeMap<Service, u16>,
}

impl ServicePortMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service: Service, port: u16) {
        self.ports.insert(service, port);
    }

    pub fn get(&self, service: Service) -> Option<u16> {
        self.ports.get(&service).copied()
    }

    /// 割り当て済みのポート、無ければデフォルト
    pub fn port_or_default(&self, service: Service) -> u16 {
        self.get(service).unwrap_or_else(|| service.default_port())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Service, u16)> + '_ {
        self.ports.iter().map(|(s, p)| (*s, *p))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// 子プロセスに渡す `XXX_PORT=番号` の組
    pub fn to_env_overrides(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(service, port)| (service.port_key(), port.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_table() {
        let table: Vec<_> = Service::ALL
            .iter()
            .map(|s| (s.name(), s.default_port()))
            .collect();
        assert_eq!(
            table,
            vec![
                ("FASTAPI", 8000),
                ("RABBITMQ", 5672),
                ("RABBITMQ_UI", 15672),
                ("POSTGRES", 5432),
                ("REDIS", 6379),
                ("PGADMIN", 5050),
                ("REDIS_COMMANDER", 8081),
            ]
        );
    }

    #[test]
    fn test_infrastructure_excludes_application() {
        let infra: Vec<_> = Service::infrastructure().collect();
        assert_eq!(infra.len(), 6);
        assert!(!infra.contains(&Service::Fastapi));
        assert!(infra.contains(&Service::Postgres));
    }

    #[test]
    fn test_configured_port_from_env() {
        let env = EnvConfig::parse("RABBITMQ_UI_PORT=25672");
        assert_eq!(Service::RabbitmqUi.configured_port(&env).unwrap(), 25672);
        assert_eq!(Service::Redis.configured_port(&env).unwrap(), 6379);
    }

    #[test]
    fn test_env_overrides() {
        let mut ports = ServicePortMap::new();
        ports.insert(Service::Redis, 6380);
        ports.insert(Service::Postgres, 5432);

        let overrides = ports.to_env_overrides();
        assert!(overrides.contains(&("REDIS_PORT".to_string(), "6380".to_string())));
        assert!(overrides.contains(&("POSTGRES_PORT".to_string(), "5432".to_string())));
        assert_eq!(ports.port_or_default(Service::Pgadmin), 5050);
    }
}
