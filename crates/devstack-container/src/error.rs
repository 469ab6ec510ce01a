use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "Dockerデーモンに接続できません\n\nヒント:\n  • Docker Desktop（または Docker Engine）が起動しているか確認してください\n  • WSL など他のサービスと競合していないか確認してください\n  • docker info コマンドが正常に動作するか確認してください"
    )]
    DaemonNotRunning,

    #[error(
        "Dockerへのアクセス権限がありません\n\nヒント:\n  • ユーザーを docker グループに追加するか、管理者権限で実行してください"
    )]
    DaemonPermissionDenied,

    #[error(
        "コンテナ名が競合しています{}\n\nヒント:\n  • 競合するコンテナを削除してください:\n    docker rm -f $(docker ps -aq)",
        .container.as_ref().map(|c| format!(": '{}' は既に使用されています", c)).unwrap_or_default()
    )]
    NameConflict { container: Option<String> },

    #[error("必要なファイルが見つかりません: {0}")]
    MissingFile(PathBuf),

    #[error("{program} の実行に失敗しました (exit code: {code:?})\n{stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{start} 以降に空いているポートがありません")]
    NoFreePort { start: u16 },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContainerError>;

static CONTAINER_NAME_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"The container name "([^"]+)""#).expect("container name pattern"),
        Regex::new(r#""([^"]+)"\s+is already in use by container"#).expect("in-use pattern"),
    ]
});

/// Docker / compose のエラー出力を分類する
///
/// 既知のパターンに一致しなければ `None`（呼び出し側で元の失敗として扱う）。
pub fn translate_failure(output: &str) -> Option<ContainerError> {
    let lower = output.to_lowercase();
    if lower.contains("docker daemon is not running")
        || lower.contains("pipe/docker_engine")
        || lower.contains("cannot connect to the docker daemon")
    {
        return Some(ContainerError::DaemonNotRunning);
    }

    if output.contains("is already in use by container") {
        let container = CONTAINER_NAME_PATTERNS
            .iter()
            .find_map(|pattern| pattern.captures(output))
            .map(|caps| caps[1].trim_start_matches('/').to_string());
        return Some(ContainerError::NameConflict { container });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_daemon_not_running() {
        let err = translate_failure(
            "error during connect: open //./pipe/docker_engine: The system cannot find the file specified.",
        );
        assert!(matches!(err, Some(ContainerError::DaemonNotRunning)));

        let err = translate_failure(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
        );
        assert!(matches!(err, Some(ContainerError::DaemonNotRunning)));
    }

    #[test]
    fn test_translate_name_conflict() {
        let stderr = r#"Error response from daemon: Conflict. The container name "/web_1" is already in use by container "3f2a". You have to remove (or rename) that container to be able to reuse that name."#;
        match translate_failure(stderr) {
            Some(ContainerError::NameConflict { container }) => {
                assert_eq!(container.as_deref(), Some("web_1"));
            }
            other => panic!("Expected NameConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_translate_name_conflict_short_form() {
        let err = translate_failure(r#"container "web_1" is already in use by container 9c1e"#);
        match err {
            Some(ContainerError::NameConflict { container }) => {
                assert_eq!(container.as_deref(), Some("web_1"));
            }
            other => panic!("Expected NameConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_translate_name_conflict_without_name() {
        let err = translate_failure("Conflict: is already in use by container abc");
        assert!(matches!(
            err,
            Some(ContainerError::NameConflict { container: None })
        ));
    }

    #[test]
    fn test_translate_unknown_failure() {
        assert!(translate_failure("no such service: worker").is_none());
        assert!(translate_failure("Conflict detected").is_none());
    }

    #[test]
    fn test_name_conflict_message_has_remediation() {
        let msg = ContainerError::NameConflict {
            container: Some("web_1".into()),
        }
        .to_string();
        assert!(msg.contains("web_1"));
        assert!(msg.contains("docker rm -f"));
    }
}
