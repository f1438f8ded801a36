// Path: crates/gateway/src/handlers.rs
//! Endpoint handlers: DTO ↔ coordinator translation only.

use axum::extract::{ConnectInfo, Path, State};
use axum::Json;
use std::net::SocketAddr;

use warden_coordinator::{
    CompleteSignInput, CreateMessageSessionInput, CreateTxSessionInput, ProcessRoundInput,
};
use warden_types::session::SigningPath;

use crate::dto::{
    decode_hash32, decode_messages, encode_bytes32, encode_messages, parse_session_id,
    CompleteMessageResponse, CompleteRequest, CompleteTxResponse, CreateMessageSessionRequest,
    CreateSessionResponse, CreateTxSessionRequest, RoundRequest, RoundResponse,
};
use crate::error::AppError;
use crate::GatewayState;

fn caller_ip(connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    connect_info.map(|info| info.0.ip().to_string())
}

pub(crate) async fn create_tx_session(
    State(state): State<GatewayState>,
    Path(signer_id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<CreateTxSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let transaction = request.transaction.into_request()?;

    let output = state
        .coordinator
        .create_tx_session(CreateTxSessionInput {
            signer_id,
            transaction,
            signing_path: request.signing_path.unwrap_or(SigningPath::SignerServer),
            caller_ip: caller_ip(connect_info.as_ref()),
        })
        .await?;

    Ok(Json(CreateSessionResponse {
        session_id: output.session_id.to_string(),
        server_first_messages: encode_messages(&output.server_first_messages),
        message_hash: encode_bytes32(&output.message_hash),
        eid: encode_bytes32(&output.eid),
        party_config: output.party_config.into(),
        rounds_remaining: output.rounds_remaining,
    }))
}

pub(crate) async fn create_message_session(
    State(state): State<GatewayState>,
    Path(signer_id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<CreateMessageSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let message_hash = decode_hash32(&request.message_hash)?;
    let first_message = request
        .first_message
        .as_deref()
        .map(|envelope| {
            warden_types::peer::PeerMessage::from_envelope(envelope)
                .map_err(|e| AppError::BadRequest(format!("invalid first message: {e}")))
        })
        .transpose()?;

    let output = state
        .coordinator
        .create_message_session(CreateMessageSessionInput {
            signer_id,
            message_hash,
            first_message,
            signing_path: request.signing_path.unwrap_or(SigningPath::SignerServer),
            caller_ip: caller_ip(connect_info.as_ref()),
        })
        .await?;

    Ok(Json(CreateSessionResponse {
        session_id: output.session_id.to_string(),
        server_first_messages: encode_messages(&output.server_first_messages),
        message_hash: encode_bytes32(&output.message_hash),
        eid: encode_bytes32(&output.eid),
        party_config: output.party_config.into(),
        rounds_remaining: output.rounds_remaining,
    }))
}

pub(crate) async fn process_round(
    State(state): State<GatewayState>,
    Path(signer_id): Path<String>,
    Json(request): Json<RoundRequest>,
) -> Result<Json<RoundResponse>, AppError> {
    let session_id = parse_session_id(&request.session_id)?;
    let messages = decode_messages(&request.messages)?;

    let output = state
        .coordinator
        .process_round(ProcessRoundInput {
            session_id,
            signer_id,
            messages,
        })
        .await?;

    Ok(Json(RoundResponse {
        messages: encode_messages(&output.messages),
        rounds_remaining: output.rounds_remaining,
        complete: output.complete,
    }))
}

pub(crate) async fn complete_sign(
    State(state): State<GatewayState>,
    Path(signer_id): Path<String>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompleteTxResponse>, AppError> {
    let session_id = parse_session_id(&request.session_id)?;

    let output = state
        .coordinator
        .complete_sign(CompleteSignInput {
            session_id,
            signer_id,
        })
        .await?;

    Ok(Json(CompleteTxResponse {
        tx_hash: output.tx_hash,
        signature: output.signature.into(),
    }))
}

pub(crate) async fn complete_message_sign(
    State(state): State<GatewayState>,
    Path(signer_id): Path<String>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompleteMessageResponse>, AppError> {
    let session_id = parse_session_id(&request.session_id)?;

    let output = state
        .coordinator
        .complete_message_sign(CompleteSignInput {
            session_id,
            signer_id,
        })
        .await?;

    Ok(Json(CompleteMessageResponse {
        signature: output.signature.into(),
    }))
}
