//! Pool synchronization configuration from environment variables
//!
//! Controls the JSON-RPC endpoint, the factory contract address and how
//! long writes wait for confirmation.

use std::env;
use std::time::Duration;

use crate::address::{self, Address};
use crate::error::PoolError;

/// Addresses shipped as examples that must never be treated as a deployed factory
pub const PLACEHOLDER_FACTORY_ADDRESSES: &[&str] =
    &["0x...", "0x7aA03fd7Eb166417A4f31B103843036a3a805713"];

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_POLL_SECS: u64 = 2;
const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// JSON-RPC endpoint (node or wallet bridge)
    pub rpc_url: String,
    /// Factory contract address as supplied, unvalidated
    pub factory_address: Option<String>,
    /// Delay between receipt polls while waiting for a write
    pub confirmation_poll_interval: Duration,
    /// Receipt polls before a write is reported unconfirmed
    pub confirmation_max_attempts: u32,
}

impl PoolConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FUNDPOOL_RPC_URL`: JSON-RPC endpoint (default `http://localhost:8545`)
    /// - `FACTORY_CONTRACT_ADDRESS`: deployed factory contract
    /// - `CONFIRMATION_POLL_SECS`: receipt poll interval (default 2)
    /// - `CONFIRMATION_MAX_ATTEMPTS`: receipt polls before giving up (default 60)
    ///
    /// # Examples
    ///
    /// ```bash
    /// FUNDPOOL_RPC_URL=http://localhost:8545 \
    /// FACTORY_CONTRACT_ADDRESS=0x5FbDB2315678afecb367f032d93F642f64180aa3 cargo test
    /// ```
    pub fn from_env() -> Self {
        let rpc_url = env::var("FUNDPOOL_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        log::info!("📡 RPC URL: {}", rpc_url);

        let factory_address = env::var("FACTORY_CONTRACT_ADDRESS").ok();
        match factory_address {
            Some(ref address) => log::info!("🏭 Factory contract: {}", address),
            None => log::warn!("⚠️  FACTORY_CONTRACT_ADDRESS not set"),
        }

        let confirmation_poll_interval = Duration::from_secs(
            env::var("CONFIRMATION_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_SECS),
        );

        let confirmation_max_attempts = env::var("CONFIRMATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        Self {
            rpc_url,
            factory_address,
            confirmation_poll_interval,
            confirmation_max_attempts,
        }
    }

    /// Replace the factory address
    pub fn with_factory(mut self, address: impl Into<String>) -> Self {
        self.factory_address = Some(address.into());
        self
    }

    /// Validated factory address
    ///
    /// Fails with a configuration error when the address is unset, one of the
    /// known placeholders, or malformed.
    pub fn factory_address(&self) -> Result<Address, PoolError> {
        let raw = self
            .factory_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PoolError::Configuration("FACTORY_CONTRACT_ADDRESS is not set".to_string())
            })?;

        if PLACEHOLDER_FACTORY_ADDRESSES
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(raw))
        {
            return Err(PoolError::Configuration(format!(
                "{} is a placeholder address",
                raw
            )));
        }

        address::parse(raw)
            .map_err(|_| PoolError::Configuration(format!("{} is not a valid address", raw)))
    }

    pub fn is_factory_configured(&self) -> bool {
        self.factory_address().is_ok()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            factory_address: None,
            confirmation_poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            confirmation_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
