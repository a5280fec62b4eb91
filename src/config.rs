//! Node configuration.
//!
//! Loaded from a `--config`/`CONFIG` CLI flag resolving to a JSON file,
//! with individual fields falling back to environment variables via
//! `#[serde(default = ...)]` functions, and a [`LiteralOrEnv`] wrapper so
//! secrets (the node's private key) can be supplied as
//! `"$ANT_PRIVATE_KEY"` instead of being checked into the file.

use alloy_primitives::{B256, hex};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// CLI arguments shared by every subcommand.
#[derive(Parser, Debug)]
#[command(name = "ant")]
#[command(about = "Storage-mining node agent")]
pub struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<crate::cli::Command>,
}

/// Top-level node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub chain: ChainConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub queen_addresses: Vec<String>,
    #[serde(default = "config_defaults::default_port")]
    pub port: u16,
    #[serde(default = "config_defaults::default_host")]
    pub host: IpAddr,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub endpoint: Url,
    pub locker_contract: alloy_primitives::Address,
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Raw hex-encoded secp256k1 private key, or an env-var reference
    /// (`"$ANT_PRIVATE_KEY"` / `"${ANT_PRIVATE_KEY}"`).
    pub private_key: LiteralOrEnv<EvmPrivateKey>,
    /// This node's libp2p peer id. Consumed by the embedding daemon's
    /// `Messenger`; the library itself only carries it through.
    #[serde(with = "peer_id_serde")]
    pub peer_id: libp2p_identity::PeerId,
}

mod peer_id_serde {
    use libp2p_identity::PeerId;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &PeerId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PeerId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PeerId::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

mod config_defaults {
    use std::env;
    use std::net::{IpAddr, Ipv4Addr};

    pub const DEFAULT_PORT: u16 = 4001;

    pub fn default_port() -> u16 {
        env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn default_host() -> IpAddr {
        env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

// ============================================================================
// Environment Variable Resolution
// ============================================================================

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"0xabc..."`
/// - Simple env var: `"$ANT_PRIVATE_KEY"`
/// - Braced env var: `"${ANT_PRIVATE_KEY}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if let Some(stripped) = s.strip_prefix("${") {
            stripped.strip_suffix('}').map(str::to_string)
        } else if let Some(name) = s.strip_prefix('$') {
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?
        } else {
            s
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {}", e)))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

// ============================================================================
// EVM Private Key
// ============================================================================

/// A validated EVM private key (32 bytes).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EvmPrivateKey(pub B256);

impl EvmPrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("invalid private key: {}", e))
    }
}

impl std::fmt::Display for EvmPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ============================================================================
// Loading
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    /// Loads configuration from CLI arguments and a JSON file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        Self::load_from_path(cli_args.config)
    }

    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let resolved = Path::new(&path)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
        let content =
            fs::read_to_string(&resolved).map_err(|e| ConfigError::FileRead(path.clone(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_or_env_resolves_env_var() {
        unsafe { std::env::set_var("ANT_TEST_PRIVATE_KEY", "0x".to_string() + &"11".repeat(32)) };
        let json = r#""$ANT_TEST_PRIVATE_KEY""#;
        let parsed: LiteralOrEnv<EvmPrivateKey> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.inner().as_bytes(), &[0x11u8; 32]);
    }

    #[test]
    fn literal_or_env_passes_through_literal() {
        let key_hex = format!("0x{}", "22".repeat(32));
        let json = format!("\"{}\"", key_hex);
        let parsed: LiteralOrEnv<EvmPrivateKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.inner().as_bytes(), &[0x22u8; 32]);
    }

    #[test]
    fn full_config_document_deserializes() {
        let key_hex = format!("0x{}", "33".repeat(32));
        let peer_id = libp2p_identity::Keypair::generate_secp256k1().public().to_peer_id();
        let json = format!(
            r#"{{
                "chain": {{
                    "endpoint": "http://localhost:8545",
                    "locker_contract": "0x0000000000000000000000000000000000000001",
                    "node_id": "ant-1"
                }},
                "identity": {{
                    "private_key": "{key_hex}",
                    "peer_id": "{peer_id}"
                }},
                "queen_addresses": ["/ip4/127.0.0.1/tcp/4001"]
            }}"#
        );
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.chain.node_id.as_deref(), Some("ant-1"));
        assert_eq!(config.identity.peer_id, peer_id);
        assert_eq!(config.queen_addresses, vec!["/ip4/127.0.0.1/tcp/4001".to_string()]);
        assert_eq!(config.port, 4001);
    }
}
