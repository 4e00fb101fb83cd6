//! # Explorer Links

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::Signature;

/// Network the client is connected to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    /// Development network.
    #[default]
    Devnet,
    /// Test network.
    Testnet,
    /// Main network.
    MainnetBeta,
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Devnet => write!(f, "devnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::MainnetBeta => write!(f, "mainnet-beta"),
        }
    }
}

/// Best-effort explorer link for a transaction.
pub fn explorer_tx_url(host: &str, signature: &Signature, cluster: Cluster) -> String {
    format!("https://{host}/tx/{signature}?cluster={cluster}")
}
