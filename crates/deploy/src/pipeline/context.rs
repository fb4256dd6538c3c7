//! Context handed to a step body while it runs.

use serde_json::Value;

use super::step::Step;
use crate::{CommandSpec, DeployError, OperatorGate, ProcessOutput, ProcessRunner, SettingsStore};

/// Everything a running step may touch.
///
/// Settings access is limited to the keys the step declared: reading an
/// undeclared key or writing an undeclared one is an error.
pub struct StepContext<'a> {
    step: &'a Step,
    settings: &'a SettingsStore,
    runner: &'a dyn ProcessRunner,
    gate: &'a dyn OperatorGate,
}

impl<'a> StepContext<'a> {
    pub fn new(
        step: &'a Step,
        settings: &'a SettingsStore,
        runner: &'a dyn ProcessRunner,
        gate: &'a dyn OperatorGate,
    ) -> Self {
        Self {
            step,
            settings,
            runner,
            gate,
        }
    }

    /// Read a declared string input that must be present.
    pub fn require(&self, key: &str) -> Result<String, DeployError> {
        self.check_input(key)?;
        self.settings
            .get_str(key)
            .ok_or_else(|| DeployError::MissingRequiredSetting {
                step: self.step.name().to_string(),
                key: key.to_string(),
            })
    }

    /// Write a declared output.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> anyhow::Result<()> {
        if !self.step.outputs().iter().any(|k| k == key) {
            return Err(DeployError::UndeclaredOutput {
                step: self.step.name().to_string(),
                key: key.to_string(),
            }
            .into());
        }
        self.settings.set(key, value)?;
        tracing::info!(step = %self.step.name(), key, "Stored setting");
        Ok(())
    }

    /// Run an external command.
    pub async fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, DeployError> {
        tracing::debug!(step = %self.step.name(), command = %cmd, "Step invoking command");
        self.runner.run(cmd).await
    }

    /// Block until the operator acknowledges `prompt`.
    pub async fn confirm(&self, prompt: &str) -> anyhow::Result<()> {
        self.gate.wait(prompt).await
    }

    fn check_input(&self, key: &str) -> Result<(), DeployError> {
        if self.step.inputs().iter().any(|k| k == key) {
            Ok(())
        } else {
            Err(DeployError::UndeclaredInput {
                step: self.step.name().to_string(),
                key: key.to_string(),
            })
        }
    }
}
