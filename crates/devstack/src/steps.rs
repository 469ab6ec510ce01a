//! 起動シーケンスの進捗表示
//!
//! 各ステップの開始・完了・所要時間をタイムスタンプ付きで出力し、
//! 最後にサマリーを表示する。

use chrono::Local;
use colored::Colorize;
use std::time::{Duration, Instant};

/// インフラ起動の各ステップ（この順に実行する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraStep {
    /// 環境ファイルの読み込み
    LoadConfig,
    /// インフラ用ポートの空き確認
    ValidatePorts,
    /// Dockerデーモンの確認
    ValidateDaemon,
    /// 既存コンテナの停止とボリューム削除
    ResetContainers,
    /// ポート割り当て
    AllocatePorts,
    /// コンテナ起動
    StartContainers,
    /// 疎通待機
    AwaitReadiness,
    /// DB接続情報の診断
    Diagnostics,
    /// DB作成
    BootstrapDatabase,
    /// マイグレーション
    Migrate,
    /// 接続情報の表示
    ReportSummary,
}

impl InfraStep {
    /// ステップの日本語名
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadConfig => "設定読み込み",
            Self::ValidatePorts => "ポート確認",
            Self::ValidateDaemon => "Dockerデーモン確認",
            Self::ResetContainers => "既存コンテナ削除",
            Self::AllocatePorts => "ポート割り当て",
            Self::StartContainers => "コンテナ起動",
            Self::AwaitReadiness => "サービス待機",
            Self::Diagnostics => "DB診断",
            Self::BootstrapDatabase => "DB作成",
            Self::Migrate => "マイグレーション",
            Self::ReportSummary => "接続情報",
        }
    }
}

/// ステップの実行結果
#[derive(Debug, Clone)]
pub enum StepResult {
    Success { duration: Duration },
    /// 失敗したが続行した
    Warning { message: String, duration: Duration },
    Failed { error: String, duration: Duration },
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Success { duration, .. }
            | Self::Warning { duration, .. }
            | Self::Failed { duration, .. } => *duration,
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// ステップログ出力器
pub struct StepLogger {
    start_time: Instant,
    step_results: Vec<(InfraStep, StepResult)>,
    current_step: Option<(InfraStep, Instant)>,
}

impl StepLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            step_results: Vec::new(),
            current_step: None,
        }
    }

    /// ステップ開始をログ出力
    pub fn start_step(&mut self, step: InfraStep) {
        println!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), step.name());
        self.current_step = Some((step, Instant::now()));
    }

    /// ステップ成功をログ出力
    pub fn step_success(&mut self, message: Option<&str>) {
        let Some((step, start)) = self.current_step.take() else {
            return;
        };
        let duration = start.elapsed();
        let duration_str = format_duration(duration);

        match message {
            Some(msg) => println!(
                "[{}] {} {} ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                msg,
                duration_str.dimmed()
            ),
            None => println!(
                "[{}] {} {} 完了 ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                step.name(),
                duration_str.dimmed()
            ),
        }

        self.step_results.push((
            step,
            StepResult::Success { duration },
        ));
    }

    /// 失敗したが続行するステップ
    pub fn step_warning(&mut self, message: &str) {
        let Some((step, start)) = self.current_step.take() else {
            return;
        };
        let duration = start.elapsed();
        println!(
            "[{}] {} {}: {}",
            timestamp().dimmed(),
            "⚠".yellow().bold(),
            step.name(),
            message.yellow()
        );

        self.step_results.push((
            step,
            StepResult::Warning {
                message: message.to_string(),
                duration,
            },
        ));
    }

    /// ステップ失敗をログ出力
    pub fn step_failed(&mut self, error: &str) {
        let Some((step, start)) = self.current_step.take() else {
            return;
        };
        let duration = start.elapsed();
        println!(
            "[{}] {} {}",
            timestamp().dimmed(),
            "✗".red().bold(),
            step.name().red()
        );

        self.step_results.push((
            step,
            StepResult::Failed {
                error: error.to_string(),
                duration,
            },
        ));
    }

    /// 詳細メッセージをログ出力
    pub fn log_detail(&self, message: &str) {
        println!("[{}]   → {}", timestamp().dimmed(), message.cyan());
    }

    /// 全ステップが成功したか
    pub fn all_success(&self) -> bool {
        self.step_results
            .iter()
            .all(|(_, result)| result.is_success())
    }

    /// 最も時間がかかったステップ
    pub fn slowest_step(&self) -> Option<(InfraStep, Duration)> {
        self.step_results
            .iter()
            .map(|(step, result)| (*step, result.duration()))
            .max_by_key(|(_, d)| *d)
    }

    /// サマリーを出力
    pub fn print_summary(&self) {
        let total_duration = self.start_time.elapsed();
        let warning_count = self
            .step_results
            .iter()
            .filter(|(_, result)| matches!(result, StepResult::Warning { .. }))
            .count();
        let error_count = self
            .step_results
            .iter()
            .filter(|(_, result)| matches!(result, StepResult::Failed { .. }))
            .count();

        println!();
        println!("{}", "═".repeat(44));
        println!("Startup Summary");
        println!("{}", "─".repeat(44));
        println!("Total time:    {}", format_duration(total_duration).green());

        if let Some((step, duration)) = self.slowest_step() {
            println!(
                "Slowest step:  {} ({})",
                step.name(),
                format_duration(duration)
            );
        }

        if warning_count > 0 {
            println!("Warnings:      {}", warning_count.to_string().yellow());
        } else {
            println!("Warnings:      0");
        }

        if self.all_success() {
            println!("Errors:        {}", "0".green());
        } else {
            println!("Errors:        {}", error_count.to_string().red().bold());
        }

        for (step, result) in &self.step_results {
            match result {
                StepResult::Warning { message, .. } => {
                    println!("  {} {}: {}", "⚠".yellow(), step.name(), message);
                }
                StepResult::Failed { error, .. } => {
                    let first_line = error.lines().next().unwrap_or_default();
                    println!("  {} {}: {}", "✗".red(), step.name(), first_line);
                }
                StepResult::Success { .. } => {}
            }
        }
        println!("{}", "═".repeat(44));
    }
}

impl Default for StepLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Duration を読みやすい形式にフォーマット
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let minutes = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", minutes, secs)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_logger_records_results() {
        let mut logger = StepLogger::new();
        logger.start_step(InfraStep::LoadConfig);
        logger.step_success(None);
        logger.start_step(InfraStep::AwaitReadiness);
        logger.step_warning("RabbitMQ が応答しません");
        assert!(logger.all_success());

        logger.start_step(InfraStep::Migrate);
        logger.step_failed("exit code 1");
        assert!(!logger.all_success());
        assert_eq!(logger.step_results.len(), 3);
    }

    #[test]
    fn test_finish_without_start_is_ignored() {
        let mut logger = StepLogger::new();
        logger.step_success(Some("noop"));
        logger.step_failed("noop");
        assert!(logger.step_results.is_empty());
        assert!(logger.slowest_step().is_none());
    }
}
