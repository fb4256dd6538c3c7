use std::path::{Path, PathBuf};

use futures::future::BoxFuture;

use super::{EnvBinding, cmd::HardhatCmdBuilder};
use crate::{CredentialSource, StepBody, StepContext, TokenKind, settings::keys};

const DEPLOY_SCRIPT: &str = "scripts/deploy-amb.js";

/// `hardhat compile`.
#[derive(Debug, Clone)]
pub struct CompileContract {
    contract_dir: PathBuf,
}

impl CompileContract {
    pub fn new(contract_dir: &Path) -> Self {
        Self {
            contract_dir: contract_dir.to_path_buf(),
        }
    }
}

impl StepBody for CompileContract {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.run(&HardhatCmdBuilder::task("compile").build(&self.contract_dir))
                .await?;
            Ok(())
        })
    }
}

/// Deploys the marketplace contract and stores its address.
#[derive(Debug, Clone)]
pub struct DeployContract {
    contract_dir: PathBuf,
    network: String,
    credentials: CredentialSource,
}

impl DeployContract {
    pub fn new(contract_dir: &Path, network: &str, credentials: CredentialSource) -> Self {
        Self {
            contract_dir: contract_dir.to_path_buf(),
            network: network.to_string(),
            credentials,
        }
    }

    async fn deploy(&self, ctx: &StepContext<'_>) -> anyhow::Result<()> {
        let endpoint = EnvBinding::endpoint("AMB_HTTP_ENDPOINT", keys::AMB_ENDPOINT).resolve(ctx)?;
        let private_key = EnvBinding::setting("PRIVATE_KEY", keys::PRIVATE_KEY).resolve(ctx)?;
        let credentials = self.credentials.resolve()?;

        let cmd = HardhatCmdBuilder::run(DEPLOY_SCRIPT)
            .network(&self.network)
            .build(&self.contract_dir)
            .envs([endpoint, private_key])
            .envs(credentials.env_overlay());
        let output = ctx.run(&cmd).await?;

        let contract_address = TokenKind::ContractAddress.extract(&output.stdout)?;
        ctx.set(keys::CONTRACT_ADDRESS, contract_address.as_str())?;
        tracing::info!(contract_address = %contract_address, network = %self.network, "Contract deployed");
        Ok(())
    }
}

impl StepBody for DeployContract {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.deploy(ctx))
    }
}
