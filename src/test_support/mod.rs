//! Test utilities and mocks for berth unit tests.
//!
//! The [`MockExecutor`] records every command it is asked to run and answers
//! with scripted outputs, so command compilers and cluster operations can be
//! tested without docker, helm or a cloud account.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::{MockExecutor, MockProcessOutput};
//!
//! let mut exec = MockExecutor::new();
//! exec.expect_prefix("gcloud projects describe", MockProcessOutput::success("shop-123"));
//! ```

pub mod fixtures;

use crate::core::error::{BerthError, BerthResult};
use crate::util::process::{Executor, ProcessBuilder, ProcessOutput};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

impl From<MockProcessOutput> for ProcessOutput {
    fn from(mock: MockProcessOutput) -> Self {
        ProcessOutput {
            status: Some(mock.status),
            stdout: mock.stdout,
            stderr: mock.stderr,
        }
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
        }
    }
}

#[derive(Debug, Clone)]
struct CommandExpectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

/// Recording executor.
///
/// Commands are matched against expectations in the order they were added;
/// unmatched commands get the default output, which is success unless
/// [`MockExecutor::strict`] was called.
#[derive(Debug)]
pub struct MockExecutor {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
    default_output: Option<MockProcessOutput>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create a mock that answers every command with success.
    pub fn new() -> Self {
        MockExecutor {
            expectations: Vec::new(),
            calls: Vec::new(),
            default_output: Some(MockProcessOutput::default()),
        }
    }

    /// Reject commands that match no expectation.
    pub fn strict(mut self) -> Self {
        self.default_output = None;
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&mut self, cmd: &str, output: MockProcessOutput) -> &mut Self {
        self.push(CommandPattern::Exact(cmd.to_string()), output)
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&mut self, prefix: &str, output: MockProcessOutput) -> &mut Self {
        self.push(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    fn push(&mut self, pattern: CommandPattern, output: MockProcessOutput) -> &mut Self {
        self.expectations
            .push(CommandExpectation { pattern, output });
        self
    }

    /// Get all commands that were called.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl Executor for MockExecutor {
    fn run(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        let full_cmd = cmd.display_command();
        self.calls.push(full_cmd.clone());

        if let Some(exp) = self
            .expectations
            .iter()
            .find(|exp| exp.pattern.matches(&full_cmd))
        {
            return Ok(exp.output.clone().into());
        }

        match &self.default_output {
            Some(default) => Ok(default.clone().into()),
            None => Err(BerthError::not_found("program", full_cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_basic() {
        let mut exec = MockExecutor::new();
        exec.expect("docker --version", MockProcessOutput::success("Docker 27"));

        let out = exec
            .run(&ProcessBuilder::new("docker").arg("--version"))
            .unwrap();
        assert_eq!(out.stdout, "Docker 27");
        assert_eq!(exec.calls(), &["docker --version".to_string()]);
    }

    #[test]
    fn test_mock_executor_failure_is_checked() {
        let mut exec = MockExecutor::new();
        exec.expect_prefix("helm", MockProcessOutput::failure(1, "no chart"));

        let err = exec
            .run_checked(&ProcessBuilder::new("helm").arg("install"))
            .unwrap_err();
        assert!(err.to_string().contains("no chart"));
    }

    #[test]
    fn test_mock_executor_strict() {
        let mut exec = MockExecutor::new().strict();
        assert!(exec.run(&ProcessBuilder::new("kubectl")).is_err());
    }
}
