// Path: crates/scheme/src/engine.rs
//! In-process CGGMP24 scheme engine.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use cggmp24::key_share::AnyKeyShare;
use cggmp24::security_level::SecurityLevel128;
use cggmp24::supported_curves::Secp256k1;

use warden_api::scheme::{
    CreateSignSession, CreatedSession, RawSignature, RoundOutput, SchemeBackend, SchemeEngine,
};
use warden_types::error::SchemeError;
use warden_types::peer::PeerMessage;

use crate::session::SignSession;

/// Scheme engine running CGGMP24 signing sessions in-process on the
/// num-bigint backend. Each session is an independent state machine; the
/// engine's table is the only shared state.
#[derive(Default)]
pub struct Cggmp24Engine {
    sessions: DashMap<String, Mutex<SignSession>>,
}

impl Cggmp24Engine {
    /// Builds an engine with an empty session table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (diagnostics only).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SchemeEngine for Cggmp24Engine {
    fn backend(&self) -> SchemeBackend {
        SchemeBackend::WasmCompatible
    }

    async fn create_sign_session(
        &self,
        params: CreateSignSession<'_>,
    ) -> Result<CreatedSession, SchemeError> {
        let (session, first_messages) = SignSession::start(
            params.core_share,
            params.aux_info,
            params.message_hash,
            params.party_index,
            params.parties_at_keygen,
            params.eid,
        )?;

        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .insert(session_id.clone(), Mutex::new(session));

        Ok(CreatedSession {
            session_id,
            first_messages,
        })
    }

    async fn process_sign_round(
        &self,
        session_id: &str,
        incoming: &[PeerMessage],
    ) -> Result<RoundOutput, SchemeError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SchemeError::UnknownSession(session_id.into()))?;

        let mut session = entry.lock();
        let messages = session.process_round(incoming)?;
        Ok(RoundOutput {
            messages,
            complete: session.is_complete(),
        })
    }

    async fn finalize_sign(&self, session_id: &str) -> Result<RawSignature, SchemeError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SchemeError::UnknownSession(session_id.into()))?;

        let session = entry.lock();
        session
            .signature
            .ok_or_else(|| SchemeError::Finalize("protocol has not completed".into()))
    }

    fn extract_public_key(&self, core_share: &[u8]) -> Result<[u8; 33], SchemeError> {
        extract_public_key_bytes(core_share)
    }

    async fn destroy_session(&self, session_id: &str) {
        // Dropping the session reclaims the state machine and zeroizes
        // the key share it borrowed.
        self.sessions.remove(session_id);
    }
}

/// Reads the shared public key out of a serialized key share. Key-share
/// JSON is backend-independent, so the native bridge reuses this too.
pub fn extract_public_key_bytes(core_share: &[u8]) -> Result<[u8; 33], SchemeError> {
    // Accept either a combined KeyShare or a bare core share.
    let point = if let Ok(ks) =
        serde_json::from_slice::<cggmp24::KeyShare<Secp256k1, SecurityLevel128>>(core_share)
    {
        ks.shared_public_key()
    } else if let Ok(iks) =
        serde_json::from_slice::<cggmp24::IncompleteKeyShare<Secp256k1>>(core_share)
    {
        iks.shared_public_key()
    } else {
        return Err(SchemeError::CreateSession(
            "key share does not expose a public key".into(),
        ));
    };

    let encoded = point.to_bytes(true);
    let bytes = encoded.as_bytes();
    if bytes.len() != 33 {
        return Err(SchemeError::CreateSession(format!(
            "unexpected public key encoding length {}",
            bytes.len()
        )));
    }
    let mut compressed = [0u8; 33];
    compressed.copy_from_slice(bytes);
    Ok(compressed)
}
