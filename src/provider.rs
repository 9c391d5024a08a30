//! Wallet/node provider seam
//!
//! `Provider` is the EIP-1193 surface the rest of the crate talks to: account
//! discovery, chain id, code lookups, read calls and transaction submission.
//! `RpcProvider` implements it over JSON-RPC/HTTP. Nothing is pinned to a
//! chain at construction; every request goes to whatever network the
//! endpoint currently serves.

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::address::Address;
use crate::config::PoolConfig;
use crate::error::PoolError;

/// Outgoing transaction, signed by the provider on behalf of `from`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    /// Value transferred in wei
    pub value: U256,
    /// Calldata; empty for a plain value transfer
    pub data: Vec<u8>,
}

/// Mined transaction outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    /// false when the transaction reverted
    pub success: bool,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Accounts already authorized for this origin, without prompting
    async fn accounts(&self) -> Result<Vec<String>, PoolError>;

    /// Ask the user to authorize accounts
    async fn request_accounts(&self) -> Result<Vec<String>, PoolError>;

    /// Current chain id as a hex string
    async fn chain_id(&self) -> Result<String, PoolError>;

    /// Deployed bytecode; empty when nothing is deployed
    async fn get_code(&self, address: &Address) -> Result<Vec<u8>, PoolError>;

    /// Read-only call against the latest block
    async fn call(&self, to: &Address, data: Vec<u8>) -> Result<Vec<u8>, PoolError>;

    /// Submit a transaction and return its hash
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, PoolError>;

    /// Receipt for a transaction, `None` while still pending
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, PoolError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// JSON-RPC 2.0 provider over HTTP
pub struct RpcProvider {
    url: String,
    /// reqwest::Client is internally Arc-based
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.rpc_url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC request and deserialize its result
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("→ {} #{}", method, id);

        let response: RpcResponse = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(PoolError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}

#[async_trait]
impl Provider for RpcProvider {
    async fn accounts(&self) -> Result<Vec<String>, PoolError> {
        self.request("eth_accounts", json!([])).await
    }

    async fn request_accounts(&self) -> Result<Vec<String>, PoolError> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<String, PoolError> {
        self.request("eth_chainId", json!([])).await
    }

    async fn get_code(&self, address: &Address) -> Result<Vec<u8>, PoolError> {
        let code: String = self
            .request("eth_getCode", json!([address.to_checksum(None), "latest"]))
            .await?;
        decode_hex(&code)
    }

    async fn call(&self, to: &Address, data: Vec<u8>) -> Result<Vec<u8>, PoolError> {
        let result: String = self
            .request(
                "eth_call",
                json!([{ "to": to.to_checksum(None), "data": encode_hex(&data) }, "latest"]),
            )
            .await?;
        decode_hex(&result)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, PoolError> {
        let mut params = json!({
            "from": tx.from.to_checksum(None),
            "to": tx.to.to_checksum(None),
        });
        if !tx.value.is_zero() {
            params["value"] = json!(format!("0x{:x}", tx.value));
        }
        if !tx.data.is_empty() {
            params["data"] = json!(encode_hex(&tx.data));
        }
        self.request("eth_sendTransaction", json!([params])).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, PoolError> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;

        Ok(raw.map(|receipt| TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.as_deref().and_then(parse_quantity),
            // Pre-Byzantium receipts carry no status; treat as success
            success: receipt
                .status
                .as_deref()
                .and_then(parse_quantity)
                .map_or(true, |status| status == 1),
        }))
    }
}

/// `0x`-prefixed hex
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Bytes from a `0x`-prefixed hex string (`0x` alone is empty)
pub fn decode_hex(input: &str) -> Result<Vec<u8>, PoolError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(digits).map_err(|e| PoolError::abi(format!("invalid hex '{}': {}", input, e)))
}

fn parse_quantity(input: &str) -> Option<u64> {
    u64::from_str_radix(input.strip_prefix("0x").unwrap_or(input), 16).ok()
}
