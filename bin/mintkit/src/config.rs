//! Layered configuration: defaults, then `Mintkit.toml`, then `MINTKIT_*` variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use mintkit_deploy::{CONFIG_FILENAME, DeployConfig};

/// Environment prefix for configuration overrides.
const ENV_PREFIX: &str = "MINTKIT_";

/// CLI-only variables that share the prefix but are not configuration fields.
const CLI_ONLY_VARS: &[&str] = &["verbosity", "config", "yes"];

/// Resolve the deploy configuration for the project at `root`.
///
/// An explicit `config_file` must exist; the default `<root>/Mintkit.toml` is
/// optional.
pub fn load(root: &Path, config_file: Option<&Path>) -> Result<DeployConfig> {
    let path = match config_file {
        Some(path) if !path.exists() => {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        Some(path) if path.is_dir() => path.join(CONFIG_FILENAME),
        Some(path) => path.to_path_buf(),
        None => root.join(CONFIG_FILENAME),
    };

    let config: DeployConfig = Figment::from(Serialized::defaults(DeployConfig::with_root(root)))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(CLI_ONLY_VARS))
        .extract()
        .with_context(|| format!("Failed to load configuration (file: {})", path.display()))?;

    tracing::debug!(
        root = %config.root.display(),
        config_file = %path.display(),
        settings = %config.settings_path().display(),
        "Configuration resolved"
    );
    Ok(config)
}

/// Write `config` to `<root>/Mintkit.toml`, refusing to replace an existing
/// file unless `force` is set.
pub fn init(config: &DeployConfig, force: bool) -> Result<PathBuf> {
    let path = config.root.join(CONFIG_FILENAME);
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::create_dir_all(&config.root)
        .with_context(|| format!("Failed to create {}", config.root.display()))?;
    config.save_to_file(&path)?;
    Ok(path)
}
