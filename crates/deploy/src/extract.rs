//! Pulling structured tokens out of free-form command output.

use std::sync::LazyLock;

use alloy_core::primitives::{Address, B256};
use regex::Regex;

use crate::DeployError;

/// A 20-byte hex identifier, not embedded in a longer hex run.
///
/// Anchored on hex characters rather than word boundaries so tokens glued to
/// ANSI color codes (`\x1b[32m0x..`) still match. The token is capture group 1.
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9a-fA-F])(0x[0-9a-fA-F]{40})(?:[^0-9a-fA-F]|$)")
        .expect("valid address regex")
});

/// A 32-byte hex secret, not embedded in a longer hex run.
static PRIVATE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9a-fA-F])(0x[0-9a-fA-F]{64})(?:[^0-9a-fA-F]|$)")
        .expect("valid private key regex")
});

/// The kinds of token the marketplace steps scrape from tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TokenKind {
    #[strum(serialize = "ethereum address")]
    Address,
    #[strum(serialize = "ethereum private key")]
    PrivateKey,
    #[strum(serialize = "contract address")]
    ContractAddress,
}

impl TokenKind {
    /// The pattern that recognizes this token.
    pub fn pattern(&self) -> &'static Regex {
        match self {
            TokenKind::Address | TokenKind::ContractAddress => &ADDRESS_RE,
            TokenKind::PrivateKey => &PRIVATE_KEY_RE,
        }
    }

    /// Extract the first token of this kind from `text`.
    ///
    /// The token is returned exactly as it appeared in the text (case preserved).
    pub fn extract(&self, text: &str) -> Result<String, DeployError> {
        let token = extract(text, self.pattern(), *self)?;
        self.validate(&token)?;
        Ok(token)
    }

    fn validate(&self, token: &str) -> Result<(), DeployError> {
        let failed = |_| DeployError::ExtractionFailed { kind: *self };
        match self {
            TokenKind::Address | TokenKind::ContractAddress => {
                let address: Address = token.parse().map_err(failed)?;
                tracing::debug!(kind = %self, address = %address.to_checksum(None), "Extracted address");
            }
            TokenKind::PrivateKey => {
                token.parse::<B256>().map_err(failed)?;
                tracing::debug!(kind = %self, "Extracted private key");
            }
        }
        Ok(())
    }
}

/// Return the first non-overlapping match of `pattern` in `text`.
///
/// If the pattern has a capture group, the first group is returned instead of the
/// whole match. No match is an [`DeployError::ExtractionFailed`] naming `kind`.
pub fn extract(text: &str, pattern: &Regex, kind: TokenKind) -> Result<String, DeployError> {
    let captures = pattern
        .captures(text)
        .ok_or(DeployError::ExtractionFailed { kind })?;

    let matched = captures
        .get(1)
        .or_else(|| captures.get(0))
        .ok_or(DeployError::ExtractionFailed { kind })?;

    Ok(matched.as_str().to_string())
}
