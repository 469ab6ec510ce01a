//! コード整形と静的チェック

use colored::Colorize;
use devstack_config::DevSettings;
use devstack_container::{CommandRunner, CommandSpec};

/// 出力行を分類するパターン
pub struct LineGroup {
    pub pattern: &'static str,
    pub label: &'static str,
}

const MYPY_GROUPS: &[LineGroup] = &[
    LineGroup { pattern: "error: Incompatible", label: "型の不一致" },
    LineGroup { pattern: "error: Name", label: "名前の解決" },
    LineGroup { pattern: "error: Missing", label: "型注釈の欠落" },
    LineGroup { pattern: "error: Argument", label: "引数" },
    LineGroup { pattern: "error: Return", label: "戻り値" },
];

const FLAKE8_GROUPS: &[LineGroup] = &[
    LineGroup { pattern: "E501", label: "長すぎる行" },
    LineGroup { pattern: "F821", label: "未定義の名前" },
    LineGroup { pattern: "F841", label: "未使用の変数" },
    LineGroup { pattern: "W605", label: "不正なエスケープシーケンス" },
    LineGroup { pattern: "E262", label: "コメントの書式" },
];

const OTHER_LABEL: &str = "その他";

/// 空行を除いた出力行をグループごとにまとめる
///
/// 各行は最初に一致したグループにだけ入り、どれにも一致しない行は
/// 「その他」に入る。空のグループは返さない。
pub fn group_lines<'a>(output: &'a str, groups: &[LineGroup]) -> Vec<(&'static str, Vec<&'a str>)> {
    let mut buckets: Vec<(&'static str, Vec<&'a str>)> =
        groups.iter().map(|g| (g.label, Vec::new())).collect();
    let mut other = Vec::new();

    for line in output.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
        match groups.iter().position(|g| line.contains(g.pattern)) {
            Some(idx) => buckets[idx].1.push(line),
            None => other.push(line),
        }
    }

    buckets.push((OTHER_LABEL, other));
    buckets.retain(|(_, lines)| !lines.is_empty());
    buckets
}

fn print_groups(tool: &str, output: &str, groups: &[LineGroup]) {
    for (label, lines) in group_lines(output, groups) {
        println!();
        println!("{} {} - {}:", "🔍".cyan(), tool, label);
        for line in lines {
            println!("  - {}", line);
        }
    }
}

fn tool_command(settings: &DevSettings, program: &str) -> CommandSpec {
    CommandSpec::new(program)
        .arg(settings.toolchain.source_dir.as_str())
        .current_dir(&settings.root)
}

/// `black` と `isort` でソースを整形する
pub async fn handle_format(settings: &DevSettings, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    for program in ["black", "isort"] {
        let spec = tool_command(settings, program);
        println!("▶ {}", spec.to_string().cyan());
        let status = runner.status(&spec).await?;
        if !status.success() {
            anyhow::bail!("{} が失敗しました (exit code: {:?})", program, status.code);
        }
    }
    println!("{}", "✓ 整形完了".green());
    Ok(())
}

async fn run_checker(
    settings: &DevSettings,
    runner: &dyn CommandRunner,
    tool: &str,
    groups: &[LineGroup],
) -> anyhow::Result<bool> {
    let spec = tool_command(settings, tool);
    println!("▶ {}", spec.to_string().cyan());

    let output = runner.output(&spec).await?;
    print_groups(tool, &output.stdout, groups);

    if output.is_success() {
        println!("{} {}: 問題なし", "✓".green(), tool);
    } else {
        println!("{} {}: エラーがあります", "✗".red(), tool);
        if !output.stderr.trim().is_empty() {
            eprintln!("{}", output.stderr.trim_end());
        }
    }
    Ok(output.is_success())
}

/// `mypy` と `flake8` を実行する
///
/// 片方が失敗してももう片方は実行する。
pub async fn handle_check(settings: &DevSettings, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    let mypy = run_checker(settings, runner, "mypy", MYPY_GROUPS).await?;
    let flake8 = run_checker(settings, runner, "flake8", FLAKE8_GROUPS).await?;

    if !(mypy && flake8) {
        anyhow::bail!("静的チェックでエラーが見つかりました");
    }
    println!("{}", "✓ 静的チェック完了".green());
    Ok(())
}

/// 整形してからチェックする
pub async fn handle_lint(settings: &DevSettings, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    handle_format(settings, runner).await?;
    handle_check(settings, runner).await
}
