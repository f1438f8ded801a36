// Path: crates/chain-evm/src/rpc.rs
//! Minimal JSON-RPC 2.0 client for the chain queries the populator and
//! broadcaster need. One client per configured chain; per-call timeout is
//! set on the underlying HTTP client.

use alloy_primitives::{Address, B256, U256};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use warden_types::error::ChainError;
use warden_types::tx::{EstimateGasCall, FeeEstimate};

/// Per-request deadline for chain RPC.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Fallback priority fee (1 gwei) for nodes that reject
/// `eth_maxPriorityFeePerGas`.
const DEFAULT_PRIORITY_FEE: u128 = 1_000_000_000;

pub(crate) struct JsonRpcClient {
    url: String,
    client: reqwest::Client,
}

impl JsonRpcClient {
    pub(crate) fn new(url: String) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Rpc(format!("build http client: {e}")))?;
        Ok(Self { url, client })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}: malformed response: {e}")))?;

        if let Some(error) = response.get("error") {
            return Err(ChainError::Rpc(format!("{method}: {error}")));
        }

        serde_json::from_value(
            response
                .get("result")
                .cloned()
                .ok_or_else(|| ChainError::Rpc(format!("{method}: missing result")))?,
        )
        .map_err(|e| ChainError::Rpc(format!("{method}: unexpected result: {e}")))
    }

    pub(crate) async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        let hex: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_hex_u64(&hex, "eth_getTransactionCount")
    }

    pub(crate) async fn estimate_gas(&self, call: &EstimateGasCall) -> Result<U256, ChainError> {
        let mut obj = serde_json::Map::new();
        if let Some(from) = call.from {
            obj.insert("from".into(), json!(from));
        }
        if let Some(to) = call.to {
            obj.insert("to".into(), json!(to));
        }
        if let Some(value) = call.value {
            obj.insert("value".into(), json!(value));
        }
        if let Some(data) = &call.data {
            obj.insert("data".into(), json!(data));
        }

        let hex: String = self.call("eth_estimateGas", json!([obj])).await?;
        parse_hex_u256(&hex, "eth_estimateGas")
    }

    pub(crate) async fn estimate_fees_per_gas(&self) -> Result<FeeEstimate, ChainError> {
        let block: Value = self
            .call("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = block
            .get("baseFeePerGas")
            .and_then(Value::as_str)
            .map(|s| parse_hex_u128(s, "baseFeePerGas"))
            .transpose()?
            .unwrap_or(0);

        let priority = match self
            .call::<String>("eth_maxPriorityFeePerGas", json!([]))
            .await
        {
            Ok(hex) => parse_hex_u128(&hex, "eth_maxPriorityFeePerGas")?,
            Err(e) => {
                tracing::debug!(error = %e, "eth_maxPriorityFeePerGas unsupported, using default");
                DEFAULT_PRIORITY_FEE
            }
        };

        // Double the base fee for headroom across a few blocks.
        Ok(FeeEstimate {
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
            max_priority_fee_per_gas: priority,
        })
    }

    pub(crate) async fn send_raw_transaction(&self, signed: &[u8]) -> Result<B256, ChainError> {
        let param = format!("0x{}", alloy_primitives::hex::encode(signed));
        let hash: String = self
            .call("eth_sendRawTransaction", json!([param]))
            .await
            .map_err(|e| match e {
                ChainError::Rpc(msg) => ChainError::Broadcast(msg),
                other => other,
            })?;
        hash.parse::<B256>()
            .map_err(|e| ChainError::Broadcast(format!("malformed tx hash: {e}")))
    }
}

fn strip_0x(hex: &str) -> &str {
    hex.strip_prefix("0x").unwrap_or(hex)
}

fn parse_hex_u64(hex: &str, context: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(strip_0x(hex), 16)
        .map_err(|e| ChainError::Rpc(format!("{context}: bad quantity {hex:?}: {e}")))
}

fn parse_hex_u128(hex: &str, context: &str) -> Result<u128, ChainError> {
    u128::from_str_radix(strip_0x(hex), 16)
        .map_err(|e| ChainError::Rpc(format!("{context}: bad quantity {hex:?}: {e}")))
}

fn parse_hex_u256(hex: &str, context: &str) -> Result<U256, ChainError> {
    U256::from_str_radix(strip_0x(hex), 16)
        .map_err(|e| ChainError::Rpc(format!("{context}: bad quantity {hex:?}: {e}")))
}
