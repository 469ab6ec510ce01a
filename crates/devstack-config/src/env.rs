//! `.env` 形式ファイルの読み込み
//!
//! `KEY=VALUE` を1行1件で記述する単純な形式。`#` で始まる行と空行は無視し、
//! `=` を含まない行は黙ってスキップする。

use crate::error::{ConfigError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 開発用の環境ファイル名
pub const DEV_ENV_FILE: &str = ".env.dev";
/// テスト用の環境ファイル名
pub const TEST_ENV_FILE: &str = ".env.test";

/// 環境ファイルから読み込んだキーと値
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    values: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl EnvConfig {
    /// ファイルが見つからなかった場合の空の設定
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
        }
    }

    /// 文字列をパースする（不正な行は無視）
    pub fn parse(content: &str) -> Self {
        Self {
            values: content.lines().filter_map(parse_line).collect(),
            source: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// ポート番号として取得する。キーが無ければ `default`
    pub fn port(&self, key: &str, default: u16) -> Result<u16> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// 読み込み元のファイル
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// 1行をパースする
///
/// 最初の `=` で分割し、値の両端のクォート（`"` と `'`）を取り除く。
pub fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
    Some((key.to_string(), value.to_string()))
}

/// 使用する環境ファイルを決定する
///
/// `.env.dev` を `.env.test` より優先する。どちらも無ければ `None`。
pub fn resolve_env_file(root: &Path) -> Option<PathBuf> {
    [DEV_ENV_FILE, TEST_ENV_FILE]
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.exists())
}

/// 環境ファイルを読み込む
///
/// `path` が `None` の場合は [`resolve_env_file`] で探す。ファイルが無くても
/// エラーにはせず空の設定を返す（呼び出し側はデフォルト値を使う）。
pub fn load_env(root: &Path, path: Option<&Path>) -> EnvConfig {
    let path = match path {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => match resolve_env_file(root) {
            Some(found) => found,
            None => {
                warn!(
                    root = %root.display(),
                    "No env file found ({} or {})",
                    DEV_ENV_FILE,
                    TEST_ENV_FILE
                );
                return EnvConfig::empty();
            }
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let mut config = EnvConfig::parse(&content);
            debug!(path = %path.display(), keys = config.len(), "Loaded env file");
            config.source = Some(path);
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read env file");
            EnvConfig::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_basic_pairs() {
        let config = EnvConfig::parse("POSTGRES_USER=app\nREDIS_PORT=6380\n");
        assert_eq!(config.get("POSTGRES_USER"), Some("app"));
        assert_eq!(config.get("REDIS_PORT"), Some("6380"));
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_parse_skips_line_without_equals() {
        let config = EnvConfig::parse("GOOD=1\nthis line is broken\nALSO_GOOD=2");
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("this line is broken"), None);
    }

    #[test]
    fn test_parse_strips_quotes() {
        let config = EnvConfig::parse("A=\"value\"\nB='single'\nC=\"mixed'");
        assert_eq!(config.get("A"), Some("value"));
        assert_eq!(config.get("B"), Some("single"));
        assert_eq!(config.get("C"), Some("mixed"));
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let config = EnvConfig::parse("DATABASE_URL=postgres://u:p@h/db?sslmode=disable");
        assert_eq!(
            config.get("DATABASE_URL"),
            Some("postgres://u:p@h/db?sslmode=disable")
        );
    }

    #[test]
    fn test_parse_ignores_comments_and_blank_lines() {
        let config = EnvConfig::parse("# comment\n\n   \n  # indented comment\nKEY=v");
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_parse_empty_value_is_kept() {
        let config = EnvConfig::parse("POSTGRES_PASSWORD=");
        assert_eq!(config.get("POSTGRES_PASSWORD"), Some(""));
    }

    #[test]
    fn test_port_default_and_invalid() {
        let config = EnvConfig::parse("REDIS_PORT=6390\nPOSTGRES_PORT=abc");
        assert_eq!(config.port("REDIS_PORT", 6379).unwrap(), 6390);
        assert_eq!(config.port("RABBITMQ_PORT", 5672).unwrap(), 5672);
        assert!(matches!(
            config.port("POSTGRES_PORT", 5432),
            Err(ConfigError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_resolve_prefers_dev_over_test() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TEST_ENV_FILE), "FROM=test").unwrap();
        assert!(resolve_env_file(dir.path()).unwrap().ends_with(TEST_ENV_FILE));

        fs::write(dir.path().join(DEV_ENV_FILE), "FROM=dev").unwrap();
        assert!(resolve_env_file(dir.path()).unwrap().ends_with(DEV_ENV_FILE));

        let config = load_env(dir.path(), None);
        assert_eq!(config.get("FROM"), Some("dev"));
        assert!(config.source().unwrap().ends_with(DEV_ENV_FILE));
    }

    #[test]
    fn test_load_missing_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_env(dir.path(), None);
        assert!(config.is_empty());
        assert!(config.source().is_none());

        let config = load_env(dir.path(), Some(Path::new("nope.env")));
        assert!(config.is_empty());
    }

    #[test]
    fn test_load_explicit_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("custom.env"), "KEY=\"x\"\nbroken").unwrap();
        let config = load_env(dir.path(), Some(Path::new("custom.env")));
        assert_eq!(config.get("KEY"), Some("x"));
        assert_eq!(config.len(), 1);
    }
}
