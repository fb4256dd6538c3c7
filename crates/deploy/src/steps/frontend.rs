use std::path::{Path, PathBuf};

use futures::future::BoxFuture;

use super::names;
use crate::{DeployError, EnvTemplate, FRONTEND_ENV, SettingsStore, StepBody, StepContext};

/// Renders the front-end environment file from the settings.
#[derive(Debug, Clone)]
pub struct WriteFrontEndVars {
    path: PathBuf,
}

impl WriteFrontEndVars {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StepBody for WriteFrontEndVars {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let rendered = FRONTEND_ENV.render(|key| ctx.require(key))?;
            EnvTemplate::write(&self.path, &rendered)
        })
    }
}

/// Render the front-end environment file straight from a settings document,
/// outside of a pipeline run.
pub fn render_frontend_config(settings: &SettingsStore, path: &Path) -> anyhow::Result<()> {
    let rendered = FRONTEND_ENV.render(|key| {
        settings
            .get_str(key)
            .ok_or_else(|| DeployError::MissingRequiredSetting {
                step: names::WRITE_FRONT_END_VARS.to_string(),
                key: key.to_string(),
            })
    })?;
    EnvTemplate::write(path, &rendered)
}
