//! Error types for pool synchronization
//!
//! Configuration and provider problems are surfaced to the user, address
//! problems drop a record or mark a detail page as not found, and write
//! failures bubble up verbatim as action notifications. Per-field read
//! failures are normally recovered by the loaders and never leave them.

use thiserror::Error;

/// Core error type for pool synchronization operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// Factory address unset, placeholder or malformed
    #[error("Factory contract not configured: {0}")]
    Configuration(String),

    /// No wallet provider present
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Address failed format or checksum validation
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// No deployed code at the address, or the code is not a pool
    #[error("No contract found at address: {0}")]
    NotAContract(String),

    /// A single contract read failed
    #[error("Read failed: {0}")]
    ReadFailure(String),

    /// Transaction rejected or reverted
    #[error("Transaction failed: {0}")]
    WriteFailure(String),

    /// Transaction never showed up in a block
    #[error("Transaction {tx_hash} not confirmed after {attempts} attempts")]
    Unconfirmed { tx_hash: String, attempts: u32 },

    /// Loaded pool state rules the action out; nothing was sent
    #[error("Action not available: {0}")]
    NotEligible(String),

    /// A write was requested without a connected account
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// JSON-RPC error object returned by the node or wallet
    #[error("{message}")]
    Rpc { code: i64, message: String },

    /// Malformed ABI payload
    #[error("ABI decoding error: {0}")]
    Abi(String),

    /// Rejected user input other than amounts
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unparseable or out of range amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Helper functions for common error scenarios
impl PoolError {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress(address.into())
    }

    /// Create a non-contract error
    pub fn not_a_contract(address: impl Into<String>) -> Self {
        Self::NotAContract(address.into())
    }

    /// Create a read failure tagged with the contract function that failed
    pub fn read_failed(function: &str, reason: impl std::fmt::Display) -> Self {
        Self::ReadFailure(format!("{}: {}", function, reason))
    }

    /// Create an ABI decoding error
    pub fn abi(msg: impl Into<String>) -> Self {
        Self::Abi(msg.into())
    }

    /// True for errors that mean the target record should not be shown at all
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InvalidAddress(_) | Self::NotAContract(_))
    }
}
