// Path: crates/coordinator/src/populate.rs
//! Fills the gaps in a user-supplied transaction template from chain state.

use alloy_primitives::{Address, Bytes, U256};

use warden_api::chain::ChainAdapter;
use warden_types::error::WardenError;
use warden_types::tx::{EstimateGasCall, PopulatedTransaction, TransactionRequest};

/// Headroom applied to gas estimates: `estimated * 120 / 100`.
const GAS_HEADROOM_NUM: u64 = 120;
const GAS_HEADROOM_DEN: u64 = 100;

/// Populates missing nonce, gas limit, and EIP-1559 fees. RPC failures
/// propagate and fail the session creation.
pub async fn populate(
    chain: &dyn ChainAdapter,
    signer_address: Address,
    request: &TransactionRequest,
) -> Result<PopulatedTransaction, WardenError> {
    let value = request.value.unwrap_or(U256::ZERO);
    let data = request.data.clone().unwrap_or_else(Bytes::new);

    let nonce = match request.nonce {
        Some(nonce) => nonce,
        None => chain.get_nonce(signer_address).await?,
    };

    let gas_limit = match request.gas_limit {
        Some(limit) => limit,
        None => {
            let estimated = chain
                .estimate_gas(&EstimateGasCall {
                    from: Some(signer_address),
                    to: Some(request.to),
                    value: Some(value),
                    data: Some(data.clone()),
                })
                .await?;
            buffered_gas(estimated)
        }
    };

    let (max_fee_per_gas, max_priority_fee_per_gas) = match (
        request.max_fee_per_gas,
        request.gas_price,
    ) {
        (Some(max_fee), _) => (max_fee, request.max_priority_fee_per_gas.unwrap_or(max_fee)),
        // Legacy callers: treat the flat gas price as both bounds.
        (None, Some(gas_price)) => (gas_price, gas_price),
        (None, None) => {
            let fees = chain.estimate_fees_per_gas().await?;
            (fees.max_fee_per_gas, fees.max_priority_fee_per_gas)
        }
    };

    Ok(PopulatedTransaction {
        to: request.to,
        value,
        data,
        chain_id: request.chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
    })
}

/// Integer-safe 20% headroom, clamped into `u64`.
fn buffered_gas(estimated: U256) -> u64 {
    let buffered =
        estimated * U256::from(GAS_HEADROOM_NUM) / U256::from(GAS_HEADROOM_DEN);
    if buffered > U256::from(u64::MAX) {
        u64::MAX
    } else {
        buffered.to::<u64>()
    }
}
