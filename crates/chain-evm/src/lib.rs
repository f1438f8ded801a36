// Path: crates/chain-evm/src/lib.rs
#![forbid(unsafe_code)]

//! # Warden EVM Chain Adapter
//!
//! Implements the [`ChainAdapter`](warden_api::chain::ChainAdapter) seam for
//! EVM chains: pure EIP-1559 transaction building/serialization/decoding in
//! [`tx`], and a thin JSON-RPC client in [`rpc`] for the queries the
//! transaction populator and broadcaster need.

pub mod rpc;
pub mod tx;

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use warden_api::chain::ChainAdapter;
use warden_types::error::ChainError;
use warden_types::tx::{
    DecodedTransaction, EstimateGasCall, EthSignature, FeeEstimate, PopulatedTransaction,
};

use rpc::JsonRpcClient;

/// One configured EVM chain: pure codec plus an RPC endpoint.
pub struct EvmChain {
    chain_id: u64,
    rpc: JsonRpcClient,
}

impl EvmChain {
    /// Builds an adapter for `chain_id` served by `rpc_url`.
    pub fn new(chain_id: u64, rpc_url: impl Into<String>) -> Result<Self, ChainError> {
        Ok(Self {
            chain_id,
            rpc: JsonRpcClient::new(rpc_url.into())?,
        })
    }
}

#[async_trait]
impl ChainAdapter for EvmChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_nonce(&self, address: alloy_primitives::Address) -> Result<u64, ChainError> {
        self.rpc.get_transaction_count(address).await
    }

    async fn estimate_gas(&self, call: &EstimateGasCall) -> Result<U256, ChainError> {
        self.rpc.estimate_gas(call).await
    }

    async fn estimate_fees_per_gas(&self) -> Result<FeeEstimate, ChainError> {
        self.rpc.estimate_fees_per_gas().await
    }

    fn build_transaction(&self, tx: &PopulatedTransaction) -> Result<Vec<u8>, ChainError> {
        tx::build_unsigned(tx)
    }

    fn decode_transaction(&self, bytes: &[u8]) -> Result<DecodedTransaction, ChainError> {
        tx::decode_unsigned(bytes)
    }

    fn serialize_signed_transaction(
        &self,
        unsigned: &[u8],
        signature: &EthSignature,
    ) -> Result<Vec<u8>, ChainError> {
        tx::serialize_signed(unsigned, signature)
    }

    async fn broadcast_transaction(&self, signed: &[u8]) -> Result<B256, ChainError> {
        self.rpc.send_raw_transaction(signed).await
    }
}
