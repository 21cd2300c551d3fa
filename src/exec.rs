//! Process execution boundary.
//!
//! Drivers and operations never spawn processes directly; they go through a
//! [`Runner`] so the command lines they build can be inspected in tests.

use crate::output::OutputManager;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};

/// Executes external programs
pub trait Runner {
    /// Run `program` and return its combined stdout/stderr
    fn output(&self, program: &str, args: &[&str]) -> Result<String, ExecError>;

    /// Run `program`, streaming its output live into the run log
    fn stream(&self, program: &str, args: &[&str]) -> Result<(), ExecError> {
        self.stream_with_env(program, args, &BTreeMap::new())
    }

    /// Like [`Runner::stream`] with extra environment variables for the child
    fn stream_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &BTreeMap<String, String>,
    ) -> Result<(), ExecError>;

    /// Pipe `input` to the child's stdin and return its stdout
    fn output_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<Vec<u8>, ExecError>;
}

/// [`Runner`] backed by real processes; streamed output goes to `output`
pub struct SystemRunner<'a> {
    output: &'a OutputManager,
}

impl<'a> SystemRunner<'a> {
    pub fn new(output: &'a OutputManager) -> Self {
        Self { output }
    }
}

impl Runner for SystemRunner<'_> {
    fn output(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&out.stderr));

        if !out.status.success() {
            return Err(ExecError::ExitStatus {
                command: program.to_string(),
                exit_code: out.status.code(),
                output: combined,
            });
        }
        Ok(combined)
    }

    fn stream_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &BTreeMap<String, String>,
    ) -> Result<(), ExecError> {
        self.output
            .progress(&format!("+++ invoke: {program} {}", args.join(" ")));

        let mut child = Command::new(program)
            .args(args)
            .envs(envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        std::thread::scope(|scope| {
            if let Some(stderr) = stderr {
                scope.spawn(|| tee_lines(stderr, self.output));
            }
            if let Some(stdout) = stdout {
                tee_lines(stdout, self.output);
            }
        });

        let status = child.wait().map_err(|e| ExecError::Spawn {
            command: program.to_string(),
            source: e,
        })?;
        self.output.progress("--- invoke end");

        if !status.success() {
            return Err(ExecError::ExitStatus {
                command: format!("{program} {}", args.join(" ")),
                exit_code: status.code(),
                output: String::new(),
            });
        }
        Ok(())
    }

    fn output_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<Vec<u8>, ExecError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).map_err(|e| ExecError::Spawn {
                command: program.to_string(),
                source: e,
            })?;
        }

        let out = child.wait_with_output().map_err(|e| ExecError::Spawn {
            command: program.to_string(),
            source: e,
        })?;
        if !out.status.success() {
            return Err(ExecError::ExitStatus {
                command: program.to_string(),
                exit_code: out.status.code(),
                output: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(out.stdout)
    }
}

fn tee_lines<R: Read>(reader: R, output: &OutputManager) {
    for line in BufReader::new(reader).lines().map_while(Result::ok) {
        output.raw(&line);
    }
}

/// Errors related to external command execution
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to run command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Command '{command}' exited with error code {exit_code:?}: {output}")]
    ExitStatus {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
}
