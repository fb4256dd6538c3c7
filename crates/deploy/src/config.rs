use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::settings::SETTINGS_FILENAME;

/// The default name for the mintkit configuration file.
pub const CONFIG_FILENAME: &str = "Mintkit.toml";

/// Layout of the project being deployed and the names of the stacks it provisions.
///
/// Relative paths are resolved against [`DeployConfig::root`]. The whole struct
/// can be serialized to/from TOML format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Project root every relative path below is resolved against.
    pub root: PathBuf,
    /// Settings document holding deployment state.
    pub settings_file: PathBuf,
    /// Smart contract project (hardhat).
    pub contract_dir: PathBuf,
    /// Infrastructure project (cdk).
    pub provision_dir: PathBuf,
    /// Outputs file written by `cdk deploy`.
    pub stack_outputs_file: PathBuf,
    /// Environment file consumed by the front-end.
    pub marketplace_env_file: PathBuf,

    /// Stack that provisions the blockchain node.
    pub node_stack: String,
    /// Stack that provisions the API and user pool.
    pub api_stack: String,
    /// Hardhat network the contract is deployed to.
    pub network: String,
    /// Faucet the operator is sent to for test ether.
    pub faucet_url: String,

    /// AWS shared-credentials profile. Falls back to `AWS_PROFILE`, then `default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            settings_file: PathBuf::from(SETTINGS_FILENAME),
            contract_dir: PathBuf::from("contract"),
            provision_dir: PathBuf::from("provision"),
            stack_outputs_file: PathBuf::from("provision/stack-outputs.json"),
            marketplace_env_file: PathBuf::from("marketplace/.env.local"),
            node_stack: "SimpleNftMarketplaceBlockchainNode".to_string(),
            api_stack: "SimpleNftMarketplaceStack".to_string(),
            network: "amb".to_string(),
            faucet_url: "https://faucet.ropsten.be/".to_string(),
            aws_profile: None,
        }
    }
}

impl DeployConfig {
    /// Config rooted at `root`, with every other field at its default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.resolve(&self.settings_file)
    }

    pub fn contract_path(&self) -> PathBuf {
        self.resolve(&self.contract_dir)
    }

    pub fn provision_path(&self) -> PathBuf {
        self.resolve(&self.provision_dir)
    }

    pub fn stack_outputs_path(&self) -> PathBuf {
        self.resolve(&self.stack_outputs_file)
    }

    pub fn marketplace_env_path(&self) -> PathBuf {
        self.resolve(&self.marketplace_env_file)
    }

    /// Lock file guarding the settings document against concurrent runs.
    pub fn lock_path(&self) -> PathBuf {
        let mut path = self.settings_path().into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// The AWS profile to read credentials from.
    pub fn resolved_aws_profile(&self) -> String {
        self.aws_profile
            .clone()
            .or_else(|| std::env::var("AWS_PROFILE").ok().filter(|p| !p.is_empty()))
            .unwrap_or_else(|| crate::credentials::DEFAULT_PROFILE.to_string())
    }

    /// Save the configuration to a TOML file.
    ///
    /// `root` is left out: the file lives in the root it describes.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let mut document =
            toml::Value::try_from(self).context("Failed to serialize deploy config to TOML")?;
        if let toml::Value::Table(table) = &mut document {
            table.remove("root");
        }
        let content = toml::to_string_pretty(&document)
            .context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}
