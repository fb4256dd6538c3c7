//! Rendering settings into the front-end `.env` file.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{DeployError, settings::keys};

/// A fixed list of `KEY=value` lines, each filled from one settings key.
#[derive(Debug, Clone, Copy)]
pub struct EnvTemplate {
    entries: &'static [(&'static str, &'static str)],
}

/// The variables the marketplace UI reads at startup.
pub const FRONTEND_ENV: EnvTemplate = EnvTemplate {
    entries: &[
        ("VUE_APP_AWS_REGION", keys::REGION),
        ("VUE_APP_API_ENDPOINT", keys::NFT_API_ENDPOINT),
        ("VUE_APP_USER_POOL_ID", keys::USER_POOL_ID),
        ("VUE_APP_USER_POOL_WEB_CLIENT_ID", keys::USER_POOL_CLIENT_ID),
    ],
};

impl EnvTemplate {
    /// Settings keys the template needs, in line order.
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, key)| *key)
    }

    /// Render the template.
    ///
    /// `lookup` resolves a settings key; the first key it fails on aborts
    /// rendering, so a missing value never becomes a blank line.
    pub fn render<F>(&self, mut lookup: F) -> Result<String, DeployError>
    where
        F: FnMut(&'static str) -> Result<String, DeployError>,
    {
        let mut out = String::new();
        for &(var, key) in self.entries {
            let value = lookup(key)?;
            out.push_str(var);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        Ok(out)
    }

    /// Write rendered text to `path`, creating the parent directory if needed.
    pub fn write(path: &Path, rendered: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in<'a>(
        values: &'a HashMap<&'a str, &'a str>,
    ) -> impl FnMut(&'static str) -> Result<String, DeployError> + 'a {
        move |key| {
            values
                .get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| DeployError::MissingRequiredSetting {
                    step: "writeFrontEndVars".to_string(),
                    key: key.to_string(),
                })
        }
    }

    #[test]
    fn test_render_frontend_env() {
        let values = HashMap::from([
            (keys::REGION, "us-east-1"),
            (keys::NFT_API_ENDPOINT, "https://api.example.com/prod/"),
            (keys::USER_POOL_ID, "us-east-1_Abc"),
            (keys::USER_POOL_CLIENT_ID, "client123"),
        ]);

        let rendered = FRONTEND_ENV.render(lookup_in(&values)).unwrap();

        assert_eq!(
            rendered,
            "VUE_APP_AWS_REGION=us-east-1\n\
             VUE_APP_API_ENDPOINT=https://api.example.com/prod/\n\
             VUE_APP_USER_POOL_ID=us-east-1_Abc\n\
             VUE_APP_USER_POOL_WEB_CLIENT_ID=client123\n"
        );
    }

    #[test]
    fn test_render_fails_on_missing_value() {
        let values = HashMap::from([(keys::REGION, "us-east-1")]);

        let err = FRONTEND_ENV.render(lookup_in(&values)).unwrap_err();

        assert!(matches!(
            err,
            DeployError::MissingRequiredSetting { ref key, .. } if key == keys::NFT_API_ENDPOINT
        ));
    }

    #[test]
    fn test_required_keys_follow_line_order() {
        let required: Vec<_> = FRONTEND_ENV.required_keys().collect();
        assert_eq!(
            required,
            [
                keys::REGION,
                keys::NFT_API_ENDPOINT,
                keys::USER_POOL_ID,
                keys::USER_POOL_CLIENT_ID
            ]
        );
    }
}
