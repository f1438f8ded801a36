// Path: crates/test_utils/src/chain.rs
//! A mock chain adapter: real EIP-1559 codec, canned RPC answers.

use alloy_primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use warden_api::chain::ChainAdapter;
use warden_chain_evm::tx;
use warden_types::error::ChainError;
use warden_types::tx::{
    DecodedTransaction, EstimateGasCall, EthSignature, FeeEstimate, PopulatedTransaction,
};

/// Chain adapter whose RPC answers are canned and whose codec is the real
/// EVM one, so hashes and round trips behave like production.
pub struct MockChain {
    chain_id: u64,
    nonce: u64,
    gas_estimate: U256,
    fees: FeeEstimate,
    fail_broadcast: Mutex<bool>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MockChain {
    /// A Sepolia-flavored mock with sane defaults.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            nonce: 7,
            gas_estimate: U256::from(21_000u64),
            fees: FeeEstimate {
                max_fee_per_gas: 30_000_000_000,
                max_priority_fee_per_gas: 1_500_000_000,
            },
            fail_broadcast: Mutex::new(false),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// Makes every broadcast fail (post-signature failure tests).
    pub fn fail_broadcasts(&self) {
        *self.fail_broadcast.lock() = true;
    }

    /// Raw signed payloads this mock has "broadcast".
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().clone()
    }
}

#[async_trait]
impl ChainAdapter for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_nonce(&self, _address: Address) -> Result<u64, ChainError> {
        Ok(self.nonce)
    }

    async fn estimate_gas(&self, _call: &EstimateGasCall) -> Result<U256, ChainError> {
        Ok(self.gas_estimate)
    }

    async fn estimate_fees_per_gas(&self) -> Result<FeeEstimate, ChainError> {
        Ok(self.fees)
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
        if *self.fail_broadcast.lock() {
            return Err(ChainError::Broadcast("node rejected the transaction".into()));
        }
        self.broadcasts.lock().push(signed.to_vec());
        Ok(keccak256(signed))
    }
}
