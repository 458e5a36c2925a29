//! The wallet boundary. Whatever holds the keys sits behind [`Wallet`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::error::Result;
use crate::tx::ContractCall;
use crate::types::TxOutcome;

/// How the app introduces itself to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDetails {
    pub name: String,
    pub icon: String,
}

impl AppDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: "/favicon.ico".to_string(),
        }
    }
}

/// Identity returned by a completed connect: one address per network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserData {
    pub mainnet: String,
    pub testnet: String,
}

impl UserData {
    pub fn address_for(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Ask the user to share an identity. Declining is `UserRejected`.
    async fn connect(&self, app: &AppDetails) -> Result<UserData>;

    /// Sign `call` and broadcast it; returns the txid.
    async fn sign_and_broadcast(&self, app: &AppDetails, call: &ContractCall)
        -> Result<TxOutcome>;
}
