// Path: crates/gateway/src/dto.rs
//! Wire DTOs for the signing endpoints.
//!
//! Money amounts travel as decimal or 0x-hex strings (JSON numbers cannot
//! hold wei), hashes and scheme messages as base64, and signature
//! components as 0x-hex.

use alloy_primitives::{Address, Bytes, B256, U256};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use warden_types::peer::PeerMessage;
use warden_types::session::{PartyConfig, SigningPath};
use warden_types::tx::{EthSignature, TransactionRequest};

use crate::error::AppError;

/// Transaction template as the peer submits it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub to: Address,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub data: Option<Bytes>,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
}

impl TransactionDto {
    pub fn into_request(self) -> Result<TransactionRequest, AppError> {
        Ok(TransactionRequest {
            to: self.to,
            value: self.value.as_deref().map(parse_u256).transpose()?,
            data: self.data,
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price.as_deref().map(parse_u128).transpose()?,
            max_fee_per_gas: self
                .max_fee_per_gas
                .as_deref()
                .map(parse_u128)
                .transpose()?,
            max_priority_fee_per_gas: self
                .max_priority_fee_per_gas
                .as_deref()
                .map(parse_u128)
                .transpose()?,
        })
    }
}

/// `POST /signers/{id}/sign/session`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTxSessionRequest {
    pub transaction: TransactionDto,
    #[serde(default)]
    pub signing_path: Option<SigningPath>,
}

/// `POST /signers/{id}/sign-message/session`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageSessionRequest {
    /// base64 of the 32-byte prehash.
    pub message_hash: String,
    /// Optional first peer message (base64 envelope).
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub signing_path: Option<SigningPath>,
}

/// Response of both session-creation endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub server_first_messages: Vec<String>,
    pub message_hash: String,
    pub eid: String,
    pub party_config: PartyConfigDto,
    pub rounds_remaining: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyConfigDto {
    pub server_party_index: u16,
    pub client_party_index: u16,
    pub parties_at_keygen: Vec<u16>,
}

impl From<PartyConfig> for PartyConfigDto {
    fn from(config: PartyConfig) -> Self {
        Self {
            server_party_index: config.server_party_index,
            client_party_index: config.client_party_index,
            parties_at_keygen: config.parties_at_keygen,
        }
    }
}

/// `POST /signers/{id}/sign/round` and `…/sign-message/round`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRequest {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    pub messages: Vec<String>,
    pub rounds_remaining: u32,
    pub complete: bool,
}

/// `POST /signers/{id}/sign/complete` and `…/sign-message/complete`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureDto {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl From<EthSignature> for SignatureDto {
    fn from(sig: EthSignature) -> Self {
        Self {
            r: format!("0x{}", hex::encode(sig.r)),
            s: format!("0x{}", hex::encode(sig.s)),
            v: sig.v,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTxResponse {
    pub tx_hash: B256,
    pub signature: SignatureDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMessageResponse {
    pub signature: SignatureDto,
}

// ── Encoding helpers ───────────────────────────────────────────────────

pub fn parse_u256(s: &str) -> Result<U256, AppError> {
    s.parse::<U256>()
        .map_err(|e| AppError::BadRequest(format!("invalid amount {s:?}: {e}")))
}

pub fn parse_u128(s: &str) -> Result<u128, AppError> {
    let parsed = if let Some(hexpart) = s.strip_prefix("0x") {
        u128::from_str_radix(hexpart, 16)
    } else {
        s.parse::<u128>()
    };
    parsed.map_err(|e| AppError::BadRequest(format!("invalid fee {s:?}: {e}")))
}

/// Decodes base64 REST envelopes into peer messages, preserving order.
pub fn decode_messages(envelopes: &[String]) -> Result<Vec<PeerMessage>, AppError> {
    envelopes
        .iter()
        .map(|envelope| {
            PeerMessage::from_envelope(envelope)
                .map_err(|e| AppError::BadRequest(format!("invalid peer message: {e}")))
        })
        .collect()
}

/// Encodes peer messages into base64 REST envelopes.
pub fn encode_messages(messages: &[PeerMessage]) -> Vec<String> {
    messages.iter().map(PeerMessage::to_envelope).collect()
}

/// Decodes a base64 32-byte hash.
pub fn decode_hash32(b64: &str) -> Result<[u8; 32], AppError> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| AppError::BadRequest(format!("invalid base64 hash: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| AppError::BadRequest("message hash must be exactly 32 bytes".into()))
}

/// Encodes 32 bytes as base64.
pub fn encode_bytes32(bytes: &[u8; 32]) -> String {
    BASE64.encode(bytes)
}

/// Parses the session id path/body parameter.
pub fn parse_session_id(s: &str) -> Result<uuid::Uuid, AppError> {
    s.parse::<uuid::Uuid>()
        .map_err(|_| AppError::BadRequest(format!("invalid session id {s:?}")))
}
