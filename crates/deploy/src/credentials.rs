//! AWS credentials from the shared credentials file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::DeployError;

/// Profile used when neither configuration nor `AWS_PROFILE` names one.
pub const DEFAULT_PROFILE: &str = "default";

/// Static credentials for one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    /// Location of the shared credentials file.
    ///
    /// `AWS_SHARED_CREDENTIALS_FILE` wins over `~/.aws/credentials`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
    }

    /// Load `profile` from the shared credentials file.
    pub fn load(profile: &str) -> Result<Self> {
        let path = Self::default_path().ok_or_else(|| DeployError::MissingCredentials {
            profile: profile.to_string(),
        })?;
        Self::load_from(&path, profile)
    }

    /// Load `profile` from a specific credentials file.
    pub fn load_from(path: &Path, profile: &str) -> Result<Self> {
        if !path.exists() {
            return Err(DeployError::MissingCredentials {
                profile: profile.to_string(),
            })
            .with_context(|| format!("Credentials file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;

        let credentials = Self::parse(&content, profile).ok_or_else(|| {
            DeployError::MissingCredentials {
                profile: profile.to_string(),
            }
        })?;
        tracing::debug!(profile, path = %path.display(), "Loaded AWS credentials");
        Ok(credentials)
    }

    /// Parse one profile out of INI-formatted credentials.
    pub fn parse(content: &str, profile: &str) -> Option<Self> {
        let mut in_profile = false;
        let mut access_key_id = None;
        let mut secret_access_key = None;
        let mut session_token = None;

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_profile = section.trim() == profile;
                continue;
            }

            if !in_profile {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "aws_access_key_id" => access_key_id = Some(value),
                "aws_secret_access_key" => secret_access_key = Some(value),
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }

        Some(Self {
            access_key_id: access_key_id?,
            secret_access_key: secret_access_key?,
            session_token,
        })
    }

    /// Environment variables that hand these credentials to a child process.
    pub fn env_overlay(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("AWS_ACCESS_KEY_ID", self.access_key_id.clone()),
            ("AWS_SECRET_ACCESS_KEY", self.secret_access_key.clone()),
        ];
        if let Some(token) = &self.session_token {
            vars.push(("AWS_SESSION_TOKEN", token.clone()));
        }
        vars
    }
}

/// Where steps obtain AWS credentials.
///
/// Profiles are read when a step needs them, so runs that skip those steps
/// never touch the credentials file.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// A profile in the shared credentials file.
    Profile(String),
    /// Fixed credentials.
    Static(AwsCredentials),
}

impl CredentialSource {
    pub fn resolve(&self) -> Result<AwsCredentials> {
        match self {
            Self::Profile(profile) => AwsCredentials::load(profile),
            Self::Static(credentials) => Ok(credentials.clone()),
        }
    }
}
