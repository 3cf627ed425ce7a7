//! External process execution
//!
//! Every build tool (cmake, make, patch, a recipe's custom steps) is run
//! through [`ProcessCommand`] so that lookup, environment and error
//! reporting behave the same way everywhere.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ProcessError, ToolchainError};

/// A command line to run to completion
#[derive(Debug, Clone, Default)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    stdin: Option<Vec<u8>>,
}

impl ProcessCommand {
    /// Create a new command for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir` instead of the current directory
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Replace the whole child environment
    #[must_use]
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Feed `input` to the child's standard input
    #[must_use]
    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// The command line as it would be typed
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command, failing unless it exits successfully
    pub fn run(&self) -> Result<(), ProcessError> {
        let program = resolve_program(&self.program)?;
        let command_line = self.display();
        tracing::info!("Running {command_line}");

        let mut command = Command::new(&program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        if let Some(env) = &self.env {
            command.env_clear().envs(env);
        }
        if self.stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let spawn_error = |e: std::io::Error| ProcessError::Spawn {
            command: command_line.clone(),
            error: e.to_string(),
        };
        let mut child = command.spawn().map_err(spawn_error)?;

        // The pipe is dropped before waiting so the child sees end of input
        let mut write_result = Ok(());
        if let (Some(input), Some(mut pipe)) = (&self.stdin, child.stdin.take()) {
            write_result = pipe.write_all(input);
        }

        let status = child.wait().map_err(spawn_error)?;
        if !status.success() {
            return Err(ProcessError::Failed {
                command: command_line,
                status: status.to_string(),
            });
        }
        write_result.map_err(spawn_error)
    }

    /// Run the command and capture standard output and error, merged
    pub fn output(&self) -> Result<String, ProcessError> {
        let program = resolve_program(&self.program)?;
        let mut command = Command::new(&program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|e| ProcessError::Spawn {
            command: self.display(),
            error: e.to_string(),
        })?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

/// Locate `program` on PATH unless it is already a path
fn resolve_program(program: &str) -> Result<PathBuf, ProcessError> {
    if program.contains('/') || program.contains('\\') {
        return Ok(PathBuf::from(program));
    }
    which::which(program).map_err(|_| {
        ProcessError::Toolchain(ToolchainError::ToolNotFound {
            tool: program.to_string(),
        })
    })
}

/// Whether `program` can be found on PATH
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}
