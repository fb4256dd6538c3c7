//! Read-only access to the outputs file written by `cdk deploy --outputs-file`.
//!
//! The file maps stack name to output key to value:
//!
//! ```json
//! { "SimpleNftMarketplaceStack": { "UserPoolId": "us-east-1_abc" } }
//! ```

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use derive_more::Deref;
use serde::Deserialize;
use serde_json::Value;

use crate::{DeployError, StepContext};

/// Parsed stack outputs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Deref)]
pub struct StackOutputs(BTreeMap<String, BTreeMap<String, Value>>);

impl StackOutputs {
    /// Load the outputs file.
    ///
    /// Unlike the settings document, a missing or malformed outputs file is fatal:
    /// it means the provisioning run that should have produced it did not.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stack outputs from {}", path.display()))?;
        let outputs: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stack outputs in {}", path.display()))?;
        tracing::debug!(path = %path.display(), stacks = outputs.len(), "Stack outputs loaded");
        Ok(outputs)
    }

    /// Look up one output.
    pub fn get(&self, stack: &str, key: &str) -> Result<&Value, DeployError> {
        self.0
            .get(stack)
            .and_then(|outputs| outputs.get(key))
            .ok_or_else(|| DeployError::MissingStackOutput {
                stack: stack.to_string(),
                key: key.to_string(),
            })
    }

    /// Copy one output into the settings under `settings_key`.
    pub fn copy_to_settings(
        &self,
        ctx: &StepContext<'_>,
        stack: &str,
        output_key: &str,
        settings_key: &str,
    ) -> Result<()> {
        let value = self.get(stack, output_key)?.clone();
        ctx.set(settings_key, value)?;
        tracing::debug!(stack, output_key, settings_key, "Copied stack output to settings");
        Ok(())
    }
}
