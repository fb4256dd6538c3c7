use std::path::{Path, PathBuf};

use futures::future::BoxFuture;

use super::EnvBinding;
use crate::{CommandSpec, CredentialSource, StepBody, StepContext, settings::keys};

/// Asks the operator to fund the generated account from a faucet.
#[derive(Debug, Clone)]
pub struct PromptForEther {
    faucet_url: String,
}

impl PromptForEther {
    pub fn new(faucet_url: &str) -> Self {
        Self {
            faucet_url: faucet_url.to_string(),
        }
    }

    pub fn prompt(&self, address: &str) -> String {
        format!(
            "Navigate to {} to add ETH to your address:\n{address}\nThen press any key to continue...",
            self.faucet_url
        )
    }
}

impl StepBody for PromptForEther {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let address = ctx.require(keys::ADDRESS)?;
            ctx.confirm(&self.prompt(&address)).await
        })
    }
}

/// Blocks until the account holds a balance on the blockchain node.
#[derive(Debug, Clone)]
pub struct WaitForEther {
    contract_dir: PathBuf,
    credentials: CredentialSource,
}

impl WaitForEther {
    pub fn new(contract_dir: &Path, credentials: CredentialSource) -> Self {
        Self {
            contract_dir: contract_dir.to_path_buf(),
            credentials,
        }
    }

    async fn wait(&self, ctx: &StepContext<'_>) -> anyhow::Result<()> {
        let endpoint = EnvBinding::endpoint("AMB_HTTP_ENDPOINT", keys::AMB_ENDPOINT).resolve(ctx)?;
        let address = EnvBinding::setting("CONTRACT_ADDRESS", keys::ADDRESS).resolve(ctx)?;
        let credentials = self.credentials.resolve()?;

        let cmd = CommandSpec::new("node")
            .arg("scripts/wait-for-balance.js")
            .current_dir(&self.contract_dir)
            .envs([endpoint, address])
            .envs(credentials.env_overlay());
        ctx.run(&cmd).await?;
        Ok(())
    }
}

impl StepBody for WaitForEther {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.wait(ctx))
    }
}
