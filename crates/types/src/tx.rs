// Path: crates/types/src/tx.rs
//! Transaction shapes exchanged with the chain adapter.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A user-supplied transaction template. Everything except `to` and
/// `chain_id` may be left for the populator to fill from chain state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Recipient address.
    pub to: Address,
    /// Value in wei.
    #[serde(default)]
    pub value: Option<U256>,
    /// Calldata.
    #[serde(default)]
    pub data: Option<Bytes>,
    /// EIP-155 chain id. Required and nonzero.
    #[serde(default)]
    pub chain_id: u64,
    /// Account nonce; populated from chain state when absent.
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Gas limit; estimated (with headroom) when absent.
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Legacy gas price. When present, suppresses EIP-1559 fee population.
    #[serde(default)]
    pub gas_price: Option<u128>,
    /// EIP-1559 max fee per gas.
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 max priority fee per gas.
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
}

/// A fully populated transaction, ready to be built into signing bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedTransaction {
    /// Recipient address.
    pub to: Address,
    /// Value in wei.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Account nonce.
    pub nonce: u64,
    /// Gas limit, including the populator's headroom.
    pub gas_limit: u64,
    /// EIP-1559 max fee per gas.
    pub max_fee_per_gas: u128,
    /// EIP-1559 max priority fee per gas.
    pub max_priority_fee_per_gas: u128,
}

/// What the chain adapter could decode out of unsigned transaction bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodedTransaction {
    /// Recipient, when the transaction is a call (not a create).
    pub to: Option<Address>,
    /// First four bytes of the calldata, when present.
    pub function_selector: Option<[u8; 4]>,
    /// Human-readable function name, when the adapter knows the selector.
    pub function_name: Option<String>,
}

/// EIP-1559 fee estimate returned by the chain adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Max fee per gas in wei.
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas in wei.
    pub max_priority_fee_per_gas: u128,
}

/// An Ethereum-style ECDSA signature with its EIP-155 recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSignature {
    /// The `r` component, 32 bytes big-endian.
    pub r: B256,
    /// The `s` component, 32 bytes big-endian, low-s normalized.
    pub s: B256,
    /// Recovery id, 27 or 28.
    pub v: u8,
}

/// Parameters of a gas estimation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateGasCall {
    /// Sender address.
    pub from: Option<Address>,
    /// Recipient address.
    pub to: Option<Address>,
    /// Value in wei.
    pub value: Option<U256>,
    /// Calldata.
    pub data: Option<Bytes>,
}
