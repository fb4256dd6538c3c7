use std::path::{Path, PathBuf};

use futures::future::BoxFuture;

use super::{EnvBinding, cmd::CdkCmdBuilder};
use crate::{StackOutputs, StepBody, StepContext};

/// Deploys one CDK stack and copies selected stack outputs into the settings.
#[derive(Debug, Clone)]
pub struct DeployStack {
    stack: String,
    provision_dir: PathBuf,
    outputs_file: PathBuf,
    confirm: Option<String>,
    bootstrap: bool,
    env: Vec<EnvBinding>,
    outputs: Vec<(String, String)>,
}

impl DeployStack {
    pub fn new(stack: impl Into<String>, provision_dir: &Path, outputs_file: &Path) -> Self {
        Self {
            stack: stack.into(),
            provision_dir: provision_dir.to_path_buf(),
            outputs_file: outputs_file.to_path_buf(),
            confirm: None,
            bootstrap: false,
            env: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Wait for the operator before touching any infrastructure.
    pub fn confirm_first(mut self, prompt: impl Into<String>) -> Self {
        self.confirm = Some(prompt.into());
        self
    }

    /// Run `cdk bootstrap` before the deploy.
    pub fn bootstrap_first(mut self) -> Self {
        self.bootstrap = true;
        self
    }

    /// Pass a setting to the deploy through the environment.
    pub fn env(mut self, binding: EnvBinding) -> Self {
        self.env.push(binding);
        self
    }

    /// Copy stack output `output_key` to setting `settings_key` after the deploy.
    pub fn output(mut self, output_key: impl Into<String>, settings_key: impl Into<String>) -> Self {
        self.outputs.push((output_key.into(), settings_key.into()));
        self
    }

    async fn deploy(&self, ctx: &StepContext<'_>) -> anyhow::Result<()> {
        if let Some(prompt) = &self.confirm {
            ctx.confirm(prompt).await?;
        }

        if self.bootstrap {
            ctx.run(&CdkCmdBuilder::bootstrap().build(&self.provision_dir))
                .await?;
        }

        let env = self
            .env
            .iter()
            .map(|binding| binding.resolve(ctx))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let cmd = CdkCmdBuilder::deploy(&self.stack)
            .outputs_file(&self.outputs_file)
            .build(&self.provision_dir)
            .envs(env);
        ctx.run(&cmd).await?;

        let outputs = StackOutputs::load(&self.outputs_file)?;
        for (output_key, settings_key) in &self.outputs {
            outputs.copy_to_settings(ctx, &self.stack, output_key, settings_key)?;
        }

        tracing::info!(stack = %self.stack, "Stack deployed");
        Ok(())
    }
}

impl StepBody for DeployStack {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.deploy(ctx))
    }
}
