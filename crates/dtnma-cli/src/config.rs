//! Configuration loading for the CLI.

use dtnma_types::config::NodeConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the loaded configuration came from.
///
/// Loading happens before the tracing subscriber exists, so the outcome is
/// kept and logged once logging is up.
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Failed { path: PathBuf, error: String },
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            Self::File(path) => info!(path = %path.display(), "Loaded configuration"),
            Self::Missing(path) => {
                info!(path = %path.display(), "Config file not found, using defaults")
            }
            Self::Failed { path, error } => warn!(
                error = %error,
                path = %path.display(),
                "Failed to load config, using defaults"
            ),
        }
    }
}

/// Default config location: `~/.dtnma/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".dtnma")
        .join("config.toml")
}

/// Load the config at `path` (or the default path), falling back to defaults.
pub fn load_config(path: Option<&Path>) -> (NodeConfig, ConfigSource) {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        return (NodeConfig::default(), ConfigSource::Missing(config_path));
    }

    let loaded = std::fs::read_to_string(&config_path)
        .map_err(|e| e.to_string())
        .and_then(|contents| NodeConfig::from_toml(&contents).map_err(|e| e.to_string()));
    match loaded {
        Ok(config) => (config, ConfigSource::File(config_path)),
        Err(error) => (
            NodeConfig::default(),
            ConfigSource::Failed {
                path: config_path,
                error,
            },
        ),
    }
}

/// Socket path to bind when none is configured.
pub fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("dtnma-{}.sock", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = load_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config, NodeConfig::default());
        assert!(matches!(source, ConfigSource::Missing(_)));
    }

    #[test]
    fn test_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n[transport]\nsocket_path = \"/tmp/agent.sock\"\n",
        )
        .unwrap();
        let (config, source) = load_config(Some(&path));
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.transport.socket_path,
            Some(PathBuf::from("/tmp/agent.sock"))
        );
        assert!(matches!(source, ConfigSource::File(_)));
    }

    #[test]
    fn test_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        let (config, source) = load_config(Some(&path));
        assert_eq!(config, NodeConfig::default());
        assert!(matches!(source, ConfigSource::Failed { .. }));
    }

    #[test]
    fn test_default_path_shape() {
        let path = default_config_path();
        assert!(path.ends_with(".dtnma/config.toml"));
    }
}
