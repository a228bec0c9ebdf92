//! Wallet/chain connector port.
//!
//! The client never talks to a node directly; it describes a contract call
//! and hands it to whatever [`ChainConnector`] implementation the embedding
//! application wired in (wallet SDK, JSON-RPC client, test double).  The
//! connector owns transport details, gas handling and confirmation polling –
//! including its own timeout policy.  The application layer deliberately
//! enforces none: `wait_for_receipt` is awaited indefinitely.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use pof_common::{ChainId, WalletAddress};

/// Process-wide, read-only connection state supplied by the wallet library.
///
/// Threaded explicitly through every reader/writer instead of living in
/// ambient global state; a new context value means a new connection identity
/// and therefore a fresh cache namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub wallet: Option<WalletAddress>,
    pub chain_id: ChainId,
}

impl ConnectionContext {
    pub fn connected(wallet: WalletAddress, chain_id: ChainId) -> Self {
        Self {
            wallet: Some(wallet),
            chain_id,
        }
    }

    pub fn disconnected(chain_id: ChainId) -> Self {
        Self {
            wallet: None,
            chain_id,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    /// Stable string identifying this connection, used as a cache-key part.
    pub fn identity(&self) -> String {
        match &self.wallet {
            Some(wallet) => format!("{}:{}", self.chain_id, wallet.canonical()),
            None => format!("{}:-", self.chain_id),
        }
    }
}

/// Transaction hash returned on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirmation record for a mined transaction.
///
/// A reverted transaction never produces a receipt here – the connector is
/// required to report it as [`ChainError::Reverted`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: u64,
}

/// A single contract invocation keyed by (address, function, arguments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: WalletAddress,
    pub function: &'static str,
    pub args: Vec<Value>,
}

impl ContractCall {
    pub fn new(contract: WalletAddress, function: &'static str) -> Self {
        Self {
            contract,
            function,
            args: Vec::new(),
        }
    }

    /// Append one positional argument (builder style).
    #[must_use]
    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Canonical rendering of the argument list, used for cache keys.
    pub fn args_fingerprint(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_default()
    }
}

/// Failures reported by the connector or while decoding its answers.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The connected network has no router deployment.
    #[error("chain {0} is not supported; switch networks to continue")]
    Unsupported(ChainId),

    /// The wallet or node refused the submission outright.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was mined but reverted on-chain.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// Transport-level connector failure.
    #[error("connector error: {0}")]
    Connector(String),

    /// The connector's answer did not match the expected shape.
    #[error("failed to decode contract response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Generic read/write primitives supplied by the wallet-connection library.
///
/// Implementations decode named contract outputs into JSON objects so the
/// typed layer above can deserialize them with serde.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Execute a side-effect-free contract call.
    async fn read(&self, call: &ContractCall) -> Result<Value, ChainError>;

    /// Submit a state-changing transaction; returns as soon as the wallet
    /// accepted it.  Confirmation is a separate `wait_for_receipt` await.
    async fn write(&self, call: &ContractCall) -> Result<TxHash, ChainError>;

    /// Await on-chain confirmation of a previously submitted transaction.
    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt, ChainError>;
}
