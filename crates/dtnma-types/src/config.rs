//! Node configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for a management node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Log filter used when `RUST_LOG` is not set. Default: "info".
    pub log_level: String,
    pub transport: TransportConfig,
    pub codec: CodecConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            transport: TransportConfig::default(),
            codec: CodecConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Transport binding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Local datagram socket path (auto-generated under the temp dir if None).
    pub socket_path: Option<PathBuf>,
    /// Largest accepted message in bytes. Default: 64 KiB.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            max_message_size: 65_536,
        }
    }
}

/// Codec limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Cap on container pre-allocation from a declared length. Default: 1024.
    pub max_prealloc: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { max_prealloc: 1024 }
    }
}
