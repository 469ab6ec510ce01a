//! 起動後の接続情報の表示

use colored::Colorize;
use devstack_config::{DevSettings, Service, ServicePortMap};

/// 表示する1行（ラベルとアドレス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub label: &'static str,
    pub value: String,
}

impl Entry {
    fn new(label: &'static str, value: String) -> Self {
        Self { label, value }
    }
}

/// 依存サービスのアドレス
pub fn service_entries(ports: &ServicePortMap) -> Vec<Entry> {
    vec![
        Entry::new(
            "FastAPI Swagger",
            format!("http://localhost:{}/docs", ports.port_or_default(Service::Fastapi)),
        ),
        Entry::new(
            "RabbitMQ",
            format!("http://localhost:{}", ports.port_or_default(Service::RabbitmqUi)),
        ),
        Entry::new(
            "PostgreSQL",
            format!("localhost:{}", ports.port_or_default(Service::Postgres)),
        ),
        Entry::new(
            "Redis",
            format!("localhost:{}", ports.port_or_default(Service::Redis)),
        ),
    ]
}

/// 管理画面のアドレス
pub fn admin_entries(ports: &ServicePortMap) -> Vec<Entry> {
    vec![
        Entry::new(
            "PgAdmin",
            format!("http://localhost:{}", ports.port_or_default(Service::Pgadmin)),
        ),
        Entry::new(
            "Redis Commander",
            format!("http://localhost:{}", ports.port_or_default(Service::RedisCommander)),
        ),
    ]
}

/// ログイン情報（環境ファイルに無ければ各イメージのデフォルト）
pub fn credential_entries(settings: &DevSettings) -> Vec<Entry> {
    let pair = |user_key: &str, user_default: &str, pass_key: &str, pass_default: &str| {
        format!(
            "{} / {}",
            settings.value_or(user_key, user_default),
            settings.value_or(pass_key, pass_default)
        )
    };

    vec![
        Entry::new(
            "PgAdmin",
            pair(
                "PGADMIN_DEFAULT_EMAIL",
                "admin@admin.com",
                "PGADMIN_DEFAULT_PASSWORD",
                "admin",
            ),
        ),
        Entry::new(
            "RabbitMQ",
            pair("RABBITMQ_USER", "guest", "RABBITMQ_PASS", "guest"),
        ),
        Entry::new(
            "PostgreSQL",
            pair("POSTGRES_USER", "postgres", "POSTGRES_PASSWORD", "postgres"),
        ),
    ]
}

fn print_section(title: &str, entries: &[Entry]) {
    println!();
    println!("{}", title.bold());
    for entry in entries {
        println!("  {:<18} {}", format!("{}:", entry.label), entry.value.cyan());
    }
}

/// 接続情報をまとめて表示
pub fn print(settings: &DevSettings, ports: &ServicePortMap) {
    println!();
    println!("{}", "═".repeat(60));
    println!("{}", "🎯 インフラの準備ができました".green().bold());
    println!("{}", "═".repeat(60));

    print_section("📡 サービス:", &service_entries(ports));
    print_section("🔧 管理画面:", &admin_entries(ports));
    print_section("🔑 ログイン情報:", &credential_entries(settings));
    println!();
}
