// Path: crates/test_utils/src/engine.rs
//! A deterministic mock scheme engine.
//!
//! Sessions complete after a configurable number of rounds; the final
//! signature is a plain (single-party) ECDSA signature under the 32-byte
//! seed the mock treats as "core share", so recovery-id verification works
//! exactly as it does against the real engine.
//!
//! Like the real backends, the mock's wire encoding is backend-specific:
//! every outgoing payload is tagged with the arithmetic backend that
//! produced it, and an incoming payload under the wrong tag fails the
//! round the same way a num-bigint peer fails to parse GMP serialization.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use dashmap::DashMap;
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use uuid::Uuid;
use warden_api::scheme::{
    CreateSignSession, CreatedSession, RawSignature, RoundOutput, SchemeBackend, SchemeEngine,
};
use warden_types::error::SchemeError;
use warden_types::peer::PeerMessage;

struct MockSession {
    seed: [u8; 32],
    message_hash: [u8; 32],
    party_index: u16,
    rounds_done: u32,
    rounds_needed: u32,
}

/// Configurable mock of the scheme seam.
pub struct MockSchemeEngine {
    backend: SchemeBackend,
    rounds_needed: u32,
    fail_round: Mutex<bool>,
    sessions: DashMap<String, MockSession>,
}

impl Default for MockSchemeEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_tag(backend: SchemeBackend) -> &'static str {
    match backend {
        SchemeBackend::WasmCompatible => "bigint",
        SchemeBackend::Native => "gmp",
    }
}

impl MockSchemeEngine {
    /// A WASM-compatible mock that completes after two rounds.
    pub fn new() -> Self {
        Self {
            backend: SchemeBackend::WasmCompatible,
            rounds_needed: 2,
            fail_round: Mutex::new(false),
            sessions: DashMap::new(),
        }
    }

    /// Overrides how many rounds a session takes.
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds_needed = rounds;
        self
    }

    /// Reports (and encodes messages under) the given backend.
    pub fn with_backend(mut self, backend: SchemeBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Makes the next `process_sign_round` fail.
    pub fn fail_next_round(&self) {
        *self.fail_round.lock() = true;
    }

    /// Number of live engine-side sessions.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// A peer message as a mock engine running on `backend` would emit it.
    /// Tests use this to hand the coordinator well-formed peer traffic.
    pub fn peer_message(backend: SchemeBackend, sender: u16, round: u32) -> PeerMessage {
        PeerMessage {
            sender,
            is_broadcast: true,
            recipient: None,
            payload: BASE64.encode(format!("{}:mock round {round}", backend_tag(backend))),
        }
    }

    fn opaque_message(&self, party_index: u16, round: u32) -> PeerMessage {
        Self::peer_message(self.backend, party_index, round)
    }

    /// The wrong arithmetic produces bytes this backend cannot parse.
    fn check_payload(&self, msg: &PeerMessage) -> Result<(), SchemeError> {
        let decoded = BASE64
            .decode(&msg.payload)
            .map_err(|e| SchemeError::Round(format!("base64 decode incoming: {e}")))?;
        let text = String::from_utf8(decoded)
            .map_err(|_| SchemeError::Round("deserialize incoming: not valid UTF-8".into()))?;

        let own = backend_tag(self.backend);
        match text.split_once(':') {
            Some((tag, _)) if tag == own => Ok(()),
            Some((tag, _)) => Err(SchemeError::Round(format!(
                "deserialize incoming: {tag} wire encoding is not readable by the {own} backend"
            ))),
            None => Err(SchemeError::Round(
                "deserialize incoming: unrecognized message framing".into(),
            )),
        }
    }
}

#[async_trait]
impl SchemeEngine for MockSchemeEngine {
    fn backend(&self) -> SchemeBackend {
        self.backend
    }

    async fn create_sign_session(
        &self,
        params: CreateSignSession<'_>,
    ) -> Result<CreatedSession, SchemeError> {
        let seed: [u8; 32] = params
            .core_share
            .try_into()
            .map_err(|_| SchemeError::CreateSession("mock core share must be 32 bytes".into()))?;
        if !params.parties_at_keygen.contains(&params.party_index) {
            return Err(SchemeError::CreateSession(format!(
                "party {} not in {:?}",
                params.party_index, params.parties_at_keygen
            )));
        }

        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            MockSession {
                seed,
                message_hash: params.message_hash,
                party_index: params.party_index,
                rounds_done: 0,
                rounds_needed: self.rounds_needed,
            },
        );

        Ok(CreatedSession {
            session_id,
            first_messages: vec![self.opaque_message(params.party_index, 0)],
        })
    }

    async fn process_sign_round(
        &self,
        session_id: &str,
        incoming: &[PeerMessage],
    ) -> Result<RoundOutput, SchemeError> {
        if std::mem::take(&mut *self.fail_round.lock()) {
            return Err(SchemeError::Round("injected round failure".into()));
        }

        // Reject foreign-backend payloads before touching session state,
        // as the real state machine does when deserialization fails.
        for msg in incoming {
            self.check_payload(msg)?;
        }

        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SchemeError::UnknownSession(session_id.into()))?;

        session.rounds_done += 1;
        let complete = session.rounds_done >= session.rounds_needed;
        let messages = if complete {
            Vec::new()
        } else {
            vec![self.opaque_message(session.party_index, session.rounds_done)]
        };

        Ok(RoundOutput { messages, complete })
    }

    async fn finalize_sign(&self, session_id: &str) -> Result<RawSignature, SchemeError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SchemeError::UnknownSession(session_id.into()))?;

        if session.rounds_done < session.rounds_needed {
            return Err(SchemeError::Finalize("protocol has not completed".into()));
        }

        let key = SigningKey::from_slice(&session.seed)
            .map_err(|e| SchemeError::Finalize(format!("mock seed: {e}")))?;
        let (signature, _) = key
            .sign_prehash_recoverable(&session.message_hash)
            .map_err(|e| SchemeError::Finalize(format!("mock sign: {e}")))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature.r().to_bytes());
        s.copy_from_slice(&signature.s().to_bytes());
        Ok(RawSignature { r, s })
    }

    fn extract_public_key(&self, core_share: &[u8]) -> Result<[u8; 33], SchemeError> {
        let seed: [u8; 32] = core_share
            .try_into()
            .map_err(|_| SchemeError::CreateSession("mock core share must be 32 bytes".into()))?;
        let key = SigningKey::from_slice(&seed)
            .map_err(|e| SchemeError::CreateSession(format!("mock seed: {e}")))?;
        let mut compressed = [0u8; 33];
        compressed.copy_from_slice(key.verifying_key().to_encoded_point(true).as_bytes());
        Ok(compressed)
    }

    async fn destroy_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}
