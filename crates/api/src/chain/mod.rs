// Path: crates/api/src/chain/mod.rs
//! The chain adapter contract consumed by the coordinator.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use warden_types::error::ChainError;
use warden_types::tx::{
    DecodedTransaction, EstimateGasCall, EthSignature, FeeEstimate, PopulatedTransaction,
};

/// One EVM chain, as the coordinator sees it.
///
/// RPC-backed queries are async; transaction encoding/decoding is pure.
/// Implementations set their own per-call timeouts.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// The EIP-155 chain id this adapter serves.
    fn chain_id(&self) -> u64;

    /// Next account nonce for `address`.
    async fn get_nonce(&self, address: Address) -> Result<u64, ChainError>;

    /// Gas estimate for the given call.
    async fn estimate_gas(&self, call: &EstimateGasCall) -> Result<U256, ChainError>;

    /// Current EIP-1559 fee estimate.
    async fn estimate_fees_per_gas(&self) -> Result<FeeEstimate, ChainError>;

    /// Builds the unsigned signing payload for a populated transaction.
    /// The keccak-256 of these bytes is what gets signed.
    fn build_transaction(&self, tx: &PopulatedTransaction) -> Result<Vec<u8>, ChainError>;

    /// Best-effort decode of unsigned transaction bytes, for policy
    /// context and audit enrichment.
    fn decode_transaction(&self, bytes: &[u8]) -> Result<DecodedTransaction, ChainError>;

    /// Attaches a signature to previously built unsigned bytes, producing
    /// the network wire form.
    fn serialize_signed_transaction(
        &self,
        unsigned: &[u8],
        signature: &EthSignature,
    ) -> Result<Vec<u8>, ChainError>;

    /// Submits a signed transaction; returns its hash.
    async fn broadcast_transaction(&self, signed: &[u8]) -> Result<B256, ChainError>;
}

/// Process-wide registry of configured chains, keyed by chain id.
#[derive(Default)]
pub struct ChainRegistry {
    chains: HashMap<u64, Arc<dyn ChainAdapter>>,
}

impl ChainRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own chain id.
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.chains.insert(adapter.chain_id(), adapter);
    }

    /// Resolves an adapter, failing with `UnknownChain` when absent.
    pub fn get(&self, chain_id: u64) -> Result<Arc<dyn ChainAdapter>, ChainError> {
        self.chains
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::UnknownChain(chain_id))
    }
}
