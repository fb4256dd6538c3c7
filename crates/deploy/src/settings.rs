//! Durable key-value settings shared by all pipeline steps.
//!
//! The settings live in a single JSON object on disk. Every lookup re-reads the
//! file, so edits made between runs are always observed. A missing, empty or
//! malformed file reads as an empty object.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Default file name of the settings document.
pub const SETTINGS_FILENAME: &str = "deploy-settings.json";

/// Setting keys written by the marketplace steps.
pub mod keys {
    pub const ADDRESS: &str = "address";
    pub const PRIVATE_KEY: &str = "privateKey";
    pub const AMB_ENDPOINT: &str = "ambEndpoint";
    pub const REGION: &str = "region";
    pub const CONTRACT_ADDRESS: &str = "contractAddress";
    pub const USER_POOL_ID: &str = "userPoolId";
    pub const USER_POOL_CLIENT_ID: &str = "userPoolClientId";
    pub const NFT_API_ENDPOINT: &str = "nftApiEndpoint";
}

/// Encode/decode boundary for the settings document.
pub struct SettingsDocument;

impl SettingsDocument {
    /// Decode raw file content into a settings map.
    ///
    /// Anything that is not a JSON object decodes to the empty map.
    pub fn decode(content: &[u8]) -> Map<String, Value> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Map::new();
        }

        match serde_json::from_slice::<Value>(content) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(kind = json_kind(&other), "Settings document is not an object, treating as empty");
                Map::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Settings document is malformed, treating as empty");
                Map::new()
            }
        }
    }

    /// Encode a settings map as pretty-printed JSON.
    pub fn encode(map: &Map<String, Value>) -> Result<String> {
        let mut content =
            serde_json::to_string_pretty(map).context("Failed to serialize settings")?;
        content.push('\n');
        Ok(content)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// File-backed settings store.
///
/// Writes are read-modify-write on the whole document and are not safe under
/// concurrent writers; the pipeline only ever has one writer at a time.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty document (and its parent directory) if none exists yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        write_atomic(&self.path, "{}\n")?;
        tracing::debug!(path = %self.path.display(), "Created empty settings document");
        Ok(())
    }

    /// Read the whole document.
    ///
    /// Never fails and never creates anything: a missing document reads as
    /// empty, and unreadable content is logged and reads as empty.
    pub fn load(&self) -> Map<String, Value> {
        match std::fs::read(&self.path) {
            Ok(content) => SettingsDocument::decode(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to read settings, treating as empty");
                Map::new()
            }
        }
    }

    /// Look up a single value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.load().remove(key)
    }

    /// Look up a string value. Non-string values read as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                tracing::warn!(key, kind = json_kind(&other), "Setting is not a string");
                None
            }
            None => None,
        }
    }

    /// Merge one value into the document.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_exists()?;
        let mut map = self.load();
        map.insert(key.to_string(), value.into());
        self.write(&map)?;
        tracing::debug!(key, path = %self.path.display(), "Setting written");
        Ok(())
    }

    /// Remove one value. Returns whether the key was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut map = self.load();
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.write(&map)?;
        tracing::debug!(key, path = %self.path.display(), "Setting removed");
        Ok(true)
    }

    /// Whether the completion marker for `step` is present.
    pub fn is_complete(&self, step: &str) -> bool {
        matches!(self.get(step), Some(Value::Bool(true)))
    }

    /// Record that `step` has completed.
    pub fn mark_complete(&self, step: &str) -> Result<()> {
        self.set(step, true)
    }

    /// Decode the typed view of the marketplace values.
    pub fn marketplace(&self) -> MarketplaceSettings {
        MarketplaceSettings::from_map(&self.load())
    }

    fn write(&self, map: &Map<String, Value>) -> Result<()> {
        let content = SettingsDocument::encode(map)?;
        write_atomic(&self.path, &content)
    }
}

/// Replace `path` with `contents` through a temp file and rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("Failed to write temp settings {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace settings {}", path.display()))?;
    Ok(())
}

/// Typed view of the values the marketplace steps exchange.
///
/// Every field is optional: each one appears once the step producing it has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketplaceSettings {
    pub address: Option<String>,
    pub private_key: Option<String>,
    pub amb_endpoint: Option<String>,
    pub region: Option<String>,
    pub contract_address: Option<String>,
    pub user_pool_id: Option<String>,
    pub user_pool_client_id: Option<String>,
    pub nft_api_endpoint: Option<String>,
}

impl MarketplaceSettings {
    /// Decode from a settings map, ignoring completion markers and unknown keys.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let string = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            address: string(keys::ADDRESS),
            private_key: string(keys::PRIVATE_KEY),
            amb_endpoint: string(keys::AMB_ENDPOINT),
            region: string(keys::REGION),
            contract_address: string(keys::CONTRACT_ADDRESS),
            user_pool_id: string(keys::USER_POOL_ID),
            user_pool_client_id: string(keys::USER_POOL_CLIENT_ID),
            nft_api_endpoint: string(keys::NFT_API_ENDPOINT),
        }
    }
}
