//! Layered configuration for the Proof of Friendship client.
//!
//! Priority (lowest → highest):
//! 1. Compile-time defaults (`impl Default`).
//! 2. An optional `pof.{toml,yaml,json}` file in the working directory, or an
//!    explicit path passed to [`load_configuration`].
//! 3. Environment variables with the `POF` prefix:
//!
//!    ```text
//!    POF__GENERATOR__API_KEY=...    # double underscore = path separator
//!    ```
//!
//! The loader performs a `validate()` pass after merging; prefer returning an
//! error over silently fixing things at runtime.

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::PofError,
    types::{ChainId, WalletAddress},
    uri::DEFAULT_GATEWAY_PREFIX,
};

/// Deployed router address on Base mainnet.
const BASE_MAINNET_ROUTER: &str = "0x869B768E940A0DB225559188c9C475F387174d63";

/// Top-level configuration consumed by every layer of the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PofConfig {
    pub service: ServiceConfig,
    /// Supported chains and their deployed router contract.
    pub chains: Vec<ChainEntry>,
    pub storage: StorageConfig,
    pub generator: GeneratorConfig,
}

impl Default for PofConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            chains: vec![
                ChainEntry {
                    chain_id: 8453, // Base mainnet
                    router: BASE_MAINNET_ROUTER.to_owned(),
                },
                ChainEntry {
                    chain_id: 84_532, // Base Sepolia
                    router: BASE_MAINNET_ROUTER.to_owned(),
                },
            ],
            storage: StorageConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl PofConfig {
    /// The router address deployed on `chain_id`, if that chain is supported.
    pub fn router_for(&self, chain_id: ChainId) -> Option<WalletAddress> {
        self.chains
            .iter()
            .find(|entry| entry.chain_id == chain_id)
            .and_then(|entry| WalletAddress::parse(&entry.router).ok())
    }

    /// True iff the client carries a router deployment for `chain_id`.
    pub fn is_chain_supported(&self, chain_id: ChainId) -> bool {
        self.chains.iter().any(|entry| entry.chain_id == chain_id)
    }

    /// Validate internal consistency and invariants.
    fn validate(&self) -> Result<(), PofError> {
        if self.chains.is_empty() {
            return Err(PofError::Configuration(
                "at least one supported chain must be configured".into(),
            ));
        }

        let mut seen: BTreeMap<ChainId, &str> = BTreeMap::new();
        for entry in &self.chains {
            if !WalletAddress::is_well_formed(&entry.router) {
                return Err(PofError::Configuration(format!(
                    "chain {}: malformed router address {:?}",
                    entry.chain_id, entry.router
                )));
            }
            if seen.insert(entry.chain_id, &entry.router).is_some() {
                return Err(PofError::Configuration(format!(
                    "chain {} configured twice",
                    entry.chain_id
                )));
            }
        }

        if !self.storage.gateway_prefix.ends_with('/') {
            return Err(PofError::Configuration(
                "storage.gateway_prefix must end with '/'".into(),
            ));
        }

        Ok(())
    }
}

/// Metadata & housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name – appears in logs.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "pof-client".into(),
        }
    }
}

/// Router deployment on one supported chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    pub chain_id: ChainId,
    pub router: String,
}

/// Content-addressed storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// HTTP gateway used to resolve `ipfs://` URIs for display only.
    pub gateway_prefix: String,
    /// Upload endpoint for the `ipfs`-feature backend.
    pub upload_endpoint: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gateway_prefix: DEFAULT_GATEWAY_PREFIX.into(),
            upload_endpoint: "http://127.0.0.1:5001/api/v0/add".into(),
        }
    }
}

/// Generative image service settings.
///
/// The API key is deliberately optional at load time: generation is an
/// optional path and a missing credential must surface as a configuration
/// error *when generation is requested*, not at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash-preview-image-generation".into(),
        }
    }
}

/// Load configuration by merging layered sources (defaults → file → env).
///
/// # Errors
/// Returns [`PofError::Configuration`] when a source cannot be read, a value
/// fails to deserialize, or the merged result violates an invariant.
pub fn load_configuration(config_path: Option<&Path>) -> Result<PofConfig, PofError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        builder = builder.add_source(File::with_name("pof").required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("POF")
            .separator("__")
            .try_parsing(true),
    );

    let merged = builder.build().map_err(PofError::configuration)?;

    // Start from compile-time defaults, then let file/env override section by
    // section.  `serde(default)` on every section keeps partial files valid.
    let cfg: PofConfig = merged
        .try_deserialize()
        .map_err(PofError::configuration)?;

    cfg.validate()?;
    debug!(
        service = %cfg.service.name,
        chains = cfg.chains.len(),
        "configuration loaded"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PofConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.is_chain_supported(8453));
        assert!(!cfg.is_chain_supported(1));
        assert_eq!(
            cfg.router_for(8453).map(|a| a.as_str().to_owned()),
            Some(BASE_MAINNET_ROUTER.to_owned())
        );
    }

    #[test]
    fn rejects_empty_chain_set() {
        let cfg = PofConfig {
            chains: vec![],
            ..PofConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(PofError::Configuration(_))));
    }

    #[test]
    fn rejects_malformed_router() {
        let cfg = PofConfig {
            chains: vec![ChainEntry {
                chain_id: 1,
                router: "0xnot-an-address".into(),
            }],
            ..PofConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(PofError::Configuration(_))));
    }

    #[test]
    fn rejects_duplicate_chain() {
        let cfg = PofConfig {
            chains: vec![
                ChainEntry {
                    chain_id: 1,
                    router: BASE_MAINNET_ROUTER.into(),
                },
                ChainEntry {
                    chain_id: 1,
                    router: BASE_MAINNET_ROUTER.into(),
                },
            ],
            ..PofConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(PofError::Configuration(_))));
    }
}
