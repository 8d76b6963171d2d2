//! Subprocess execution.
//!
//! Everything berth asks of the outside world (docker, helm, kubectl and the
//! cloud CLIs) goes through an [`Executor`], so the command compilers can be
//! tested against a recording mock.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::core::error::{BerthError, BerthResult};

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

/// Quote a word for POSIX shells, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '@' | '[' | ']')
        });
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Captured output for error reports, stderr first.
    pub fn diagnostic_output(&self) -> String {
        match (self.stderr.trim(), self.stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        }
    }
}

impl From<Output> for ProcessOutput {
    fn from(output: Output) -> Self {
        ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external commands.
pub trait Executor {
    /// Run to completion, capturing stdout and stderr.
    fn run(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput>;

    /// Run with the terminal attached. Nothing is captured.
    fn run_attached(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        self.run(cmd)
    }

    /// Run and turn a non-zero exit into [`BerthError::ExternalFailure`].
    fn run_checked(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        let output = self.run(cmd)?;
        check(cmd, output)
    }

    /// Attached variant of [`Executor::run_checked`].
    fn run_attached_checked(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        let output = self.run_attached(cmd)?;
        check(cmd, output)
    }
}

fn check(cmd: &ProcessBuilder, output: ProcessOutput) -> BerthResult<ProcessOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(BerthError::ExternalFailure {
            command: cmd.display_command(),
            status: output.status,
            output: output.diagnostic_output(),
        })
    }
}

/// Executor backed by `std::process`. Calls block until the child exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        SystemExecutor
    }

    fn spawnable(&self, cmd: &ProcessBuilder) -> BerthResult<PathBuf> {
        let program = cmd.get_program();
        if program.components().count() > 1 {
            return Ok(program.to_path_buf());
        }
        find_executable(&program.to_string_lossy())
            .ok_or_else(|| BerthError::not_found("program", program.display().to_string()))
    }
}

impl Executor for SystemExecutor {
    fn run(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        let program = self.spawnable(cmd)?;
        tracing::debug!("running `{}`", cmd.display_command());

        let output = cmd
            .build_command(&program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BerthError::io(&program, e))?;
        Ok(output.into())
    }

    fn run_attached(&mut self, cmd: &ProcessBuilder) -> BerthResult<ProcessOutput> {
        let program = self.spawnable(cmd)?;
        tracing::debug!("running `{}` (attached)", cmd.display_command());

        let status = cmd
            .build_command(&program)
            .status()
            .map_err(|e| BerthError::io(&program, e))?;
        Ok(ProcessOutput {
            status: status.code(),
            ..Default::default()
        })
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
