//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Default maximum selection-set nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 5;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// Service configuration.
///
/// Everything has a sensible default; a deployment typically only overrides
/// the bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Reject queries whose selection sets nest deeper than this.
    #[serde(default = "default_max_depth")]
    pub max_query_depth: usize,

    /// Address the HTTP transport binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_query_depth: DEFAULT_MAX_DEPTH,
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = ServiceConfig::from_yaml_str("{}").expect("parse");
        assert_eq!(config.max_query_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn overrides_are_honored() {
        let config =
            ServiceConfig::from_yaml_str("max_query_depth: 3\nbind_addr: 0.0.0.0:9000\n")
                .expect("parse");
        assert_eq!(config.max_query_depth, 3);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }
}
