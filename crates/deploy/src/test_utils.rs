//! Scripted process runner for exercising pipelines without external tools.

use std::sync::{Mutex, PoisonError};

use futures::future::BoxFuture;

use crate::{CommandSpec, DeployError, ProcessOutput, ProcessRunner};

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

struct Script {
    prefix: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
    hook: Option<Hook>,
}

/// A [`ProcessRunner`] that answers from a script and records every command.
///
/// Responses are matched by command-line prefix; the most recent registration
/// wins. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    scripts: Mutex<Vec<Script>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with a successful run printing `stdout`.
    pub fn respond(&self, prefix: &str, stdout: &str) -> &Self {
        self.push(prefix, 0, stdout, "", None)
    }

    /// Answer commands starting with `prefix` with a non-zero exit.
    pub fn fail(&self, prefix: &str, exit_code: i32, stderr: &str) -> &Self {
        self.push(prefix, exit_code, "", stderr, None)
    }

    /// Run `hook` whenever a command starting with `prefix` succeeds.
    ///
    /// Used to emulate side effects such as a CLI writing an outputs file.
    pub fn on_run(
        &self,
        prefix: &str,
        stdout: &str,
        hook: impl Fn(&CommandSpec) + Send + Sync + 'static,
    ) -> &Self {
        self.push(prefix, 0, stdout, "", Some(Box::new(hook)))
    }

    fn push(
        &self,
        prefix: &str,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
        hook: Option<Hook>,
    ) -> &Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Script {
                prefix: prefix.to_string(),
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                hook,
            });
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command lines run so far, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// How many commands starting with `prefix` have run.
    pub fn count(&self, prefix: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    fn answer(&self, cmd: &CommandSpec) -> Result<ProcessOutput, DeployError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cmd.clone());

        let line = cmd.to_string();
        let scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(script) = scripts.iter().rev().find(|s| line.starts_with(&s.prefix)) else {
            return Ok(ProcessOutput {
                exit_code: Some(0),
                ..ProcessOutput::default()
            });
        };

        if script.exit_code != 0 {
            return Err(DeployError::ProcessFailed {
                command: line,
                exit_code: Some(script.exit_code),
                stdout: script.stdout.clone(),
                stderr: script.stderr.clone(),
            });
        }

        if let Some(hook) = &script.hook {
            hook(cmd);
        }

        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: script.stdout.clone(),
            stderr: script.stderr.clone(),
        })
    }
}

impl ProcessRunner for RecordingRunner {
    fn run<'a>(&'a self, cmd: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, DeployError>> {
        let result = self.answer(cmd);
        Box::pin(async move { result })
    }
}
