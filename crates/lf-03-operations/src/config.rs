//! # Client Configuration
//!
//! Defaults reproduce the browser client: devnet, the public explorer,
//! counter operations without preflight and transfers with it.

use lf_02_account_sync::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;
use crate::explorer::Cluster;

/// Default explorer host.
pub const DEFAULT_EXPLORER_HOST: &str = "explorer.solana.com";

/// Operation facade configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Network used for explorer links.
    pub cluster: Cluster,

    /// Host rendered into explorer links.
    pub explorer_host: String,

    /// Skip ledger simulation for create/increment.
    pub counter_skip_preflight: bool,

    /// Skip ledger simulation for transfers.
    pub transfer_skip_preflight: bool,

    /// Serialize operations writing the same address through an advisory
    /// lock. Off by default: concurrent operations race.
    pub serialize_same_address: bool,

    /// Account sync settings shared by the counter and balance views.
    pub sync: SyncConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            explorer_host: DEFAULT_EXPLORER_HOST.to_string(),
            counter_skip_preflight: true,
            transfer_skip_preflight: false,
            serialize_same_address: false,
            sync: SyncConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config for testing (small caches).
    pub fn for_testing() -> Self {
        Self {
            sync: SyncConfig::for_testing(),
            ..Self::default()
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.explorer_host.trim().is_empty() {
            return Err(ConfigError::EmptyExplorerHost);
        }
        Ok(())
    }
}
