//! The NFT marketplace deployment: nine steps from toolchain check to front-end config.

mod account;
pub mod cmd;
mod contract;
mod dependencies;
mod frontend;
mod funding;
mod provision;

use anyhow::{Context, Result};
use url::Url;

pub use account::CreateAccount;
pub use contract::{CompileContract, DeployContract};
pub use dependencies::CheckBinary;
pub use frontend::{WriteFrontEndVars, render_frontend_config};
pub use funding::{PromptForEther, WaitForEther};
pub use provision::DeployStack;

use crate::{
    CredentialSource, DeployConfig, DeployError, Pipeline, Step, StepContext, settings::keys,
};

/// Step names. Run-once steps use these as their completion marker keys.
pub mod names {
    pub const CHECK_DEPENDENCIES: &str = "checkDependencies";
    pub const CREATE_ACCOUNT: &str = "createAccount";
    pub const DEPLOY_AMB_NODE: &str = "deployAmbNode";
    pub const COMPILE_CONTRACT: &str = "compileContract";
    pub const PROMPT_FOR_ETHER: &str = "promptForEther";
    pub const WAIT_FOR_ETHER: &str = "waitForEther";
    pub const DEPLOY_CONTRACT: &str = "deployContract";
    pub const DEPLOY_API: &str = "deployApi";
    pub const WRITE_FRONT_END_VARS: &str = "writeFrontEndVars";
}

/// Prompt shown before the blockchain node is provisioned.
pub const NODE_DEPLOY_PROMPT: &str =
    "Press any key to begin deploying AMB node. NOTE: This can take up to 30 minutes.";

/// Build the standard marketplace pipeline for the project described by `config`.
pub fn marketplace_pipeline(
    config: &DeployConfig,
    credentials: CredentialSource,
) -> Result<Pipeline, DeployError> {
    let contract_dir = config.contract_path();
    let provision_dir = config.provision_path();
    let stack_outputs = config.stack_outputs_path();

    Pipeline::builder()
        .step(
            Step::run_once(
                names::CHECK_DEPENDENCIES,
                CheckBinary::new("cdk", "npm install -g aws-cdk"),
            )
            .title("Checking dependencies"),
        )
        .step(
            Step::run_once(names::CREATE_ACCOUNT, CreateAccount::new(&contract_dir))
                .title("Create Account")
                .produces([keys::ADDRESS, keys::PRIVATE_KEY]),
        )
        .step(
            Step::always_run(
                names::DEPLOY_AMB_NODE,
                DeployStack::new(&config.node_stack, &provision_dir, &stack_outputs)
                    .confirm_first(NODE_DEPLOY_PROMPT)
                    .bootstrap_first()
                    .output("AmbHttpEndpoint", keys::AMB_ENDPOINT)
                    .output("DeployRegion", keys::REGION),
            )
            .title("Deploy Amazon Managed Blockchain Node")
            .produces([keys::AMB_ENDPOINT, keys::REGION]),
        )
        .step(
            Step::run_once(names::COMPILE_CONTRACT, CompileContract::new(&contract_dir))
                .title("Compile Contract"),
        )
        .step(
            Step::always_run(
                names::PROMPT_FOR_ETHER,
                PromptForEther::new(&config.faucet_url),
            )
            .title("Fund Account")
            .requires([keys::ADDRESS]),
        )
        .step(
            Step::always_run(
                names::WAIT_FOR_ETHER,
                WaitForEther::new(&contract_dir, credentials.clone()),
            )
            .title("Wait For Ether")
            .requires([keys::ADDRESS, keys::AMB_ENDPOINT]),
        )
        .step(
            Step::run_once(
                names::DEPLOY_CONTRACT,
                DeployContract::new(&contract_dir, &config.network, credentials),
            )
            .title("Deploy Contract")
            .requires([keys::PRIVATE_KEY, keys::AMB_ENDPOINT])
            .produces([keys::CONTRACT_ADDRESS]),
        )
        .step(
            Step::always_run(
                names::DEPLOY_API,
                DeployStack::new(&config.api_stack, &provision_dir, &stack_outputs)
                    .env(EnvBinding::endpoint("AMB_HTTP_ENDPOINT", keys::AMB_ENDPOINT))
                    .env(EnvBinding::setting("CONTRACT_ADDRESS", keys::CONTRACT_ADDRESS))
                    .output("UserPoolId", keys::USER_POOL_ID)
                    .output("UserPoolClientId", keys::USER_POOL_CLIENT_ID)
                    .output("NftApiEndpoint", keys::NFT_API_ENDPOINT),
            )
            .title("Deploy API")
            .requires([keys::AMB_ENDPOINT, keys::CONTRACT_ADDRESS])
            .produces([
                keys::USER_POOL_ID,
                keys::USER_POOL_CLIENT_ID,
                keys::NFT_API_ENDPOINT,
            ]),
        )
        .step(
            Step::always_run(
                names::WRITE_FRONT_END_VARS,
                WriteFrontEndVars::new(config.marketplace_env_path()),
            )
            .title("Write UI Configuration")
            .requires(crate::FRONTEND_ENV.required_keys()),
        )
        .build()
}

/// Prefix a bare host with `https://` and check that the result is a URL.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("https://") || raw.starts_with("http://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = Url::parse(&candidate).with_context(|| format!("Invalid endpoint `{raw}`"))?;
    if url.host_str().is_none() {
        anyhow::bail!("Endpoint `{raw}` has no host");
    }
    Ok(candidate)
}

/// An environment variable filled from a settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvBinding {
    var: &'static str,
    key: &'static str,
    endpoint: bool,
}

impl EnvBinding {
    /// Pass the setting through unchanged.
    pub const fn setting(var: &'static str, key: &'static str) -> Self {
        Self {
            var,
            key,
            endpoint: false,
        }
    }

    /// Pass the setting as a normalized endpoint URL.
    pub const fn endpoint(var: &'static str, key: &'static str) -> Self {
        Self {
            var,
            key,
            endpoint: true,
        }
    }

    /// Resolve the binding against the running step's settings.
    pub fn resolve(&self, ctx: &StepContext<'_>) -> Result<(&'static str, String)> {
        let value = ctx.require(self.key)?;
        let value = if self.endpoint {
            normalize_endpoint(&value)?
        } else {
            value
        };
        Ok((self.var, value))
    }
}
