// Path: crates/chain-evm/src/tx.rs
//! Pure EIP-1559 transaction codec.
//!
//! `build_unsigned` emits the signing payload (`0x02 || rlp(fields)`);
//! keccak-256 of those bytes is what the threshold ceremony signs.
//! `serialize_signed` re-attaches the signature to the same payload,
//! producing the network wire form.

use alloy_consensus::transaction::{RlpEcdsaDecodableTx, SignableTransaction};
use alloy_consensus::TxEip1559;
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Signature, TxKind};
use warden_types::error::ChainError;
use warden_types::tx::{DecodedTransaction, EthSignature, PopulatedTransaction};

/// EIP-2718 type byte of a dynamic-fee transaction.
const EIP1559_TYPE: u8 = 0x02;

fn to_eip1559(tx: &PopulatedTransaction) -> TxEip1559 {
    TxEip1559 {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        gas_limit: tx.gas_limit,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        to: TxKind::Call(tx.to),
        value: tx.value,
        access_list: Default::default(),
        input: tx.data.clone(),
    }
}

/// Builds the unsigned signing payload for a populated transaction.
pub fn build_unsigned(tx: &PopulatedTransaction) -> Result<Vec<u8>, ChainError> {
    if tx.chain_id == 0 {
        return Err(ChainError::Encode("chain id must be nonzero".into()));
    }
    let typed = to_eip1559(tx);
    let mut out = Vec::with_capacity(typed.payload_len_for_signature());
    typed.encode_for_signing(&mut out);
    Ok(out)
}

fn parse_unsigned(bytes: &[u8]) -> Result<TxEip1559, ChainError> {
    match bytes.split_first() {
        Some((&EIP1559_TYPE, payload)) => TxEip1559::rlp_decode(&mut &payload[..])
            .map_err(|e| ChainError::Decode(format!("eip-1559 payload: {e}"))),
        Some((other, _)) => Err(ChainError::Decode(format!(
            "unsupported transaction type 0x{other:02x}"
        ))),
        None => Err(ChainError::Decode("empty transaction bytes".into())),
    }
}

/// Best-effort decode of an unsigned payload for policy and audit use.
pub fn decode_unsigned(bytes: &[u8]) -> Result<DecodedTransaction, ChainError> {
    let tx = parse_unsigned(bytes)?;

    let to = match tx.to {
        TxKind::Call(address) => Some(address),
        TxKind::Create => None,
    };

    let function_selector = (tx.input.len() >= 4).then(|| {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&tx.input[..4]);
        selector
    });

    Ok(DecodedTransaction {
        to,
        function_name: function_selector.and_then(well_known_function),
        function_selector,
    })
}

/// Attaches `(r, s, v)` to previously built unsigned bytes.
pub fn serialize_signed(unsigned: &[u8], sig: &EthSignature) -> Result<Vec<u8>, ChainError> {
    if sig.v != 27 && sig.v != 28 {
        return Err(ChainError::Encode(format!(
            "recovery id must be 27 or 28, got {}",
            sig.v
        )));
    }
    let tx = parse_unsigned(unsigned)?;
    let signature = Signature::from_scalars_and_parity(sig.r, sig.s, sig.v == 28);
    let signed = tx.into_signed(signature);
    Ok(signed.encoded_2718())
}

/// Maps well-known ERC-20/721 selectors to names for audit enrichment.
fn well_known_function(selector: [u8; 4]) -> Option<String> {
    let name = match selector {
        [0xa9, 0x05, 0x9c, 0xbb] => "transfer",
        [0x09, 0x5e, 0xa7, 0xb3] => "approve",
        [0x23, 0xb8, 0x72, 0xdd] => "transferFrom",
        [0x40, 0xc1, 0x0f, 0x19] => "mint",
        [0x42, 0x84, 0x2e, 0x0e] => "safeTransferFrom",
        [0xa2, 0x2c, 0xb4, 0x65] => "setApprovalForAll",
        [0xd0, 0xe3, 0x0d, 0xb0] => "deposit",
        [0x2e, 0x1a, 0x7d, 0x4d] => "withdraw",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256, Bytes, U256};

    fn sample_tx() -> PopulatedTransaction {
        PopulatedTransaction {
            to: address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
            value: U256::from(10_000_000_000_000_000u64),
            data: Bytes::new(),
            chain_id: 11155111,
            nonce: 7,
            gas_limit: 25_200,
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 1_500_000_000,
        }
    }

    #[test]
    fn build_is_deterministic() {
        let tx = sample_tx();
        let a = build_unsigned(&tx).unwrap();
        let b = build_unsigned(&tx).unwrap();
        assert_eq!(a, b);
        assert_eq!(keccak256(&a), keccak256(&b));
        assert_eq!(a[0], EIP1559_TYPE);
    }

    #[test]
    fn decode_recovers_fields_from_built_bytes() {
        let mut tx = sample_tx();
        tx.data = Bytes::from(
            hex_literal("a9059cbb000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045"),
        );
        let unsigned = build_unsigned(&tx).unwrap();
        let decoded = decode_unsigned(&unsigned).unwrap();
        assert_eq!(decoded.to, Some(tx.to));
        assert_eq!(decoded.function_selector, Some([0xa9, 0x05, 0x9c, 0xbb]));
        assert_eq!(decoded.function_name.as_deref(), Some("transfer"));
    }

    #[test]
    fn plain_transfer_has_no_selector() {
        let unsigned = build_unsigned(&sample_tx()).unwrap();
        let decoded = decode_unsigned(&unsigned).unwrap();
        assert_eq!(decoded.function_selector, None);
        assert_eq!(decoded.function_name, None);
    }

    #[test]
    fn sign_serialize_decode_round_trip() {
        use k256::ecdsa::SigningKey;

        let tx = sample_tx();
        let unsigned = build_unsigned(&tx).unwrap();
        let hash = keccak256(&unsigned);

        // A real signature so `Signed` passes any internal checks.
        let mut seed = [0u8; 32];
        seed[31] = 5;
        let key = SigningKey::from_slice(&seed).unwrap();
        let (sig, recid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig.r().to_bytes());
        s.copy_from_slice(&sig.s().to_bytes());
        let eth_sig = EthSignature {
            r: r.into(),
            s: s.into(),
            v: recid.to_byte() + 27,
        };

        let signed = serialize_signed(&unsigned, &eth_sig).unwrap();
        assert_eq!(signed[0], EIP1559_TYPE);

        let parsed = TxEip1559::rlp_decode_signed(&mut &signed[1..]).unwrap();
        assert_eq!(parsed.tx().to, TxKind::Call(tx.to));
        assert_eq!(parsed.tx().value, tx.value);
        assert_eq!(parsed.tx().chain_id, tx.chain_id);
        assert_eq!(parsed.tx().nonce, tx.nonce);
        assert_eq!(parsed.tx().input, tx.data);
    }

    #[test]
    fn rejects_wrong_type_byte_and_bad_v() {
        assert!(decode_unsigned(&[0x01, 0x00]).is_err());
        assert!(decode_unsigned(&[]).is_err());

        let unsigned = build_unsigned(&sample_tx()).unwrap();
        let bad = EthSignature {
            r: [1u8; 32].into(),
            s: [1u8; 32].into(),
            v: 2,
        };
        assert!(serialize_signed(&unsigned, &bad).is_err());
    }

    fn hex_literal(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }
}
