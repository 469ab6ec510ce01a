//! テスト用の [`CommandRunner`] 実装
//!
//! 呼び出されたコマンドを記録し、コマンドラインの部分一致で応答を返す。
//! 一致するルールが無いコマンドは出力なしで成功する。

use crate::runner::{CommandOutput, CommandRunner, CommandSpec, CommandStatus};
use async_trait::async_trait;
use std::sync::Mutex;

struct Rule {
    pattern: String,
    output: CommandOutput,
    remaining: Option<usize>,
}

#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    rules: Mutex<Vec<Rule>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pattern` を含むコマンドに常に `output` を返す
    pub fn respond(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.push_rule(pattern, output, None)
    }

    /// `pattern` を含むコマンドに1回だけ `output` を返す
    pub fn respond_once(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.push_rule(pattern, output, Some(1))
    }

    fn push_rule(&self, pattern: &str, output: CommandOutput, remaining: Option<usize>) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            output,
            remaining,
        });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// 記録したコマンドライン
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    pub fn was_called(&self, pattern: &str) -> bool {
        self.command_lines().iter().any(|line| line.contains(pattern))
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }

    fn record(&self, spec: &CommandSpec) -> CommandOutput {
        self.calls.lock().unwrap().push(spec.clone());

        let line = spec.to_string();
        let mut rules = self.rules.lock().unwrap();
        // 1回限りのルールを優先する
        let index = rules
            .iter()
            .position(|r| r.remaining.is_some_and(|n| n > 0) && line.contains(&r.pattern))
            .or_else(|| {
                rules
                    .iter()
                    .position(|r| r.remaining.is_none() && line.contains(&r.pattern))
            });

        match index {
            Some(i) => {
                let rule = &mut rules[i];
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.output.clone()
            }
            None => CommandOutput::success(""),
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn output(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        Ok(self.record(spec))
    }

    async fn status(&self, spec: &CommandSpec) -> std::io::Result<CommandStatus> {
        let output = self.record(spec);
        Ok(CommandStatus { code: output.code })
    }
}
