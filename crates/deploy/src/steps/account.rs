use std::path::{Path, PathBuf};

use futures::future::BoxFuture;

use super::cmd::HardhatCmdBuilder;
use crate::{StepBody, StepContext, TokenKind, settings::keys};

/// Generates a fresh account with `hardhat account` and stores its address and key.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    contract_dir: PathBuf,
}

impl CreateAccount {
    pub fn new(contract_dir: &Path) -> Self {
        Self {
            contract_dir: contract_dir.to_path_buf(),
        }
    }

    async fn create(&self, ctx: &StepContext<'_>) -> anyhow::Result<()> {
        let output = ctx
            .run(&HardhatCmdBuilder::task("account").build(&self.contract_dir))
            .await?;

        let address = TokenKind::Address.extract(&output.stdout)?;
        let private_key = TokenKind::PrivateKey.extract(&output.stdout)?;

        ctx.set(keys::ADDRESS, address.as_str())?;
        ctx.set(keys::PRIVATE_KEY, private_key)?;
        tracing::info!(address = %address, "Account created");
        Ok(())
    }
}

impl StepBody for CreateAccount {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.create(ctx))
    }
}
