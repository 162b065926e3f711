//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Missing file and missing variables fall back to defaults
//! suitable for local development.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("cannot parse config file {path}: {reason}")]
    Unparsable { path: String, reason: String },
}

/// Top-level server configuration.
///
/// Environment overrides: `VIGIL_LISTEN`, `VIGIL_LOG`, `VIGIL_DEBUG_VM`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    pub listen_addr: String,
    /// Default tracing filter (overridden by `RUST_LOG`).
    pub log_filter: String,
    /// Trace every VM step during condition evaluation.
    pub debug_vm: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            log_filter: "info".to_string(),
            debug_vm: false,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Unparsable {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration: the file named by `VIGIL_CONFIG` if set,
    /// otherwise defaults; then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("VIGIL_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("VIGIL_LISTEN") {
            self.listen_addr = addr;
        }
        if let Ok(filter) = std::env::var("VIGIL_LOG") {
            self.log_filter = filter;
        }
        if let Ok(flag) = std::env::var("VIGIL_DEBUG_VM") {
            self.debug_vm = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert!(!config.debug_vm);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: ServerConfig = toml::from_str("debug_vm = true").unwrap();
        assert!(config.debug_vm);
        assert_eq!(config.log_filter, "info");
    }
}
