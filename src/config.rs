//! Server configuration file
//!
//! Describes the providers an endpoint hosts. JSON and YAML are accepted,
//! chosen by file extension:
//!
//! ```yaml
//! providers:
//!   - provider_id: 42
//!     token: ABCDEFGH
//!     pool_size: 8
//! ```

use crate::error::{Error, Result};
use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Providers hosted by one endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub providers: Vec<ProviderConfig>,
}

impl ServerConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::Configuration(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate provider ids
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.provider_id) {
                return Err(Error::Configuration(format!(
                    "provider id {} listed twice",
                    provider.provider_id
                )));
            }
        }
        Ok(())
    }
}
