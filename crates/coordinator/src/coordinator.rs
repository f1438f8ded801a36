// Path: crates/coordinator/src/coordinator.rs
//! The signing coordinator: create-session → process-round* → complete.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::keccak256;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;
use uuid::Uuid;

use warden_api::chain::ChainRegistry;
use warden_api::repo::{AuditRepository, PolicyRepository, SignerRepository};
use warden_api::rules::RulesEngine;
use warden_api::scheme::{
    CreateSignSession, CreatedSession, SchemeBackend, SchemeEngine,
};
use warden_api::store::ShareStore;
use warden_crypto::material::KeyMaterial;
use warden_crypto::recovery::compute_recovery_id;
use warden_crypto::SecretBuffer;
use warden_types::audit::{AuditEntry, AuditStatus, RequestType};
use warden_types::error::WardenError;
use warden_types::peer::PeerMessage;
use warden_types::policy::PolicyDecision;
use warden_types::session::{
    PartyConfig, PolicyOutcome, SigningPath, CLEANUP_INTERVAL, MAX_CONCURRENT_SESSIONS,
    NOMINAL_SIGN_ROUNDS, SESSION_TTL,
};
use warden_types::signer::Signer;
use warden_types::tx::{EthSignature, TransactionRequest};

use crate::gate::PolicyGate;
use crate::populate;
use crate::table::{Lookup, SessionKind, SessionState, SessionTable};

/// Tunables for the session table and sweeper. Production uses the
/// defaults; tests shrink them.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Hard cap on concurrent sessions.
    pub max_sessions: usize,
    /// Absolute session lifetime.
    pub session_ttl: Duration,
    /// Sweeper period.
    pub cleanup_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_sessions: MAX_CONCURRENT_SESSIONS,
            session_ttl: SESSION_TTL,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

/// Collaborators the coordinator is wired to at startup.
pub struct CoordinatorDeps {
    /// Signer registry.
    pub signers: Arc<dyn SignerRepository>,
    /// Key-share store.
    pub shares: Arc<dyn ShareStore>,
    /// Append-only audit log.
    pub audit: Arc<dyn AuditRepository>,
    /// Policy-document store.
    pub policies: Arc<dyn PolicyRepository>,
    /// Rules evaluator.
    pub rules: Arc<dyn RulesEngine>,
    /// Configured chains.
    pub chains: Arc<ChainRegistry>,
    /// WASM-compatible scheme engine (always present).
    pub wasm_engine: Arc<dyn SchemeEngine>,
    /// Native scheme engine, when the GMP helper is configured.
    pub native_engine: Option<Arc<dyn SchemeEngine>>,
}

/// Input to [`SigningCoordinator::create_tx_session`].
pub struct CreateTxSessionInput {
    /// Target signer.
    pub signer_id: String,
    /// The transaction template to populate and sign.
    pub transaction: TransactionRequest,
    /// Which two shares cooperate. Defaults to signer+server.
    pub signing_path: SigningPath,
    /// Caller IP for the policy context and audit trail.
    pub caller_ip: Option<String>,
}

/// Input to [`SigningCoordinator::create_message_session`].
pub struct CreateMessageSessionInput {
    /// Target signer.
    pub signer_id: String,
    /// The 32-byte prehashed message supplied by the peer.
    pub message_hash: [u8; 32],
    /// The peer's first protocol message, processed immediately when given.
    pub first_message: Option<PeerMessage>,
    /// Which two shares cooperate.
    pub signing_path: SigningPath,
    /// Caller IP for the policy context and audit trail.
    pub caller_ip: Option<String>,
}

/// Result of session creation.
pub struct CreateSessionOutput {
    /// Fresh session id the peer uses on subsequent calls.
    pub session_id: Uuid,
    /// The server's first protocol messages.
    pub server_first_messages: Vec<PeerMessage>,
    /// The hash that will be signed (server-computed for transactions).
    pub message_hash: [u8; 32],
    /// Execution id binding this ceremony's messages.
    pub eid: [u8; 32],
    /// Party layout for the peer.
    pub party_config: PartyConfig,
    /// Nominal rounds left.
    pub rounds_remaining: u32,
}

/// Input to [`SigningCoordinator::process_round`].
pub struct ProcessRoundInput {
    /// Session to advance.
    pub session_id: Uuid,
    /// Owning signer; must match the session.
    pub signer_id: String,
    /// The peer's messages, delivered atomically in order.
    pub messages: Vec<PeerMessage>,
}

/// Result of one round.
pub struct ProcessRoundOutput {
    /// The server's response messages.
    pub messages: Vec<PeerMessage>,
    /// Rounds left (0 once complete).
    pub rounds_remaining: u32,
    /// True once the scheme reports a signature.
    pub complete: bool,
}

/// Input to the completion calls.
pub struct CompleteSignInput {
    /// Session to finalize.
    pub session_id: Uuid,
    /// Owning signer; must match the session.
    pub signer_id: String,
}

/// Result of completing a transaction session.
pub struct CompleteSignOutput {
    /// Hash of the broadcast transaction.
    pub tx_hash: alloy_primitives::B256,
    /// The final signature.
    pub signature: EthSignature,
}

/// Result of completing a message session.
pub struct MessageSignOutput {
    /// The final signature.
    pub signature: EthSignature,
}

/// The coordinator. One per process; cheap to share behind an `Arc`.
pub struct SigningCoordinator {
    signers: Arc<dyn SignerRepository>,
    shares: Arc<dyn ShareStore>,
    audit: Arc<dyn AuditRepository>,
    chains: Arc<ChainRegistry>,
    gate: PolicyGate,
    wasm_engine: Arc<dyn SchemeEngine>,
    native_engine: Option<Arc<dyn SchemeEngine>>,
    table: SessionTable,
    config: CoordinatorConfig,
}

impl SigningCoordinator {
    /// Wires a coordinator to its collaborators.
    pub fn new(deps: CoordinatorDeps, config: CoordinatorConfig) -> Self {
        let gate = PolicyGate::new(deps.audit.clone(), deps.policies, deps.rules);
        Self {
            signers: deps.signers,
            shares: deps.shares,
            audit: deps.audit,
            chains: deps.chains,
            gate,
            wasm_engine: deps.wasm_engine,
            native_engine: deps.native_engine,
            table: SessionTable::new(config.session_ttl, config.max_sessions),
            config,
        }
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.table.len()
    }

    // ── Session creation ───────────────────────────────────────────────

    /// Opens a transaction-signing session.
    pub async fn create_tx_session(
        &self,
        input: CreateTxSessionInput,
    ) -> Result<CreateSessionOutput, WardenError> {
        if self.table.is_saturated() {
            return Err(WardenError::Saturated);
        }

        let signer = self.require_active_signer(&input.signer_id).await?;

        if input.transaction.chain_id == 0 {
            return Err(WardenError::MissingChainId);
        }
        let chain = self.chains.get(input.transaction.chain_id)?;

        let transaction =
            populate::populate(chain.as_ref(), signer.eth_address, &input.transaction).await?;
        let unsigned = chain.build_transaction(&transaction)?;
        let decoded = chain.decode_transaction(&unsigned)?;

        let ctx = self
            .gate
            .build_tx_context(&signer, &transaction, &decoded, input.caller_ip.clone())
            .await?;
        let decision = self.gate.evaluate(&signer.id, &ctx).await?;
        let outcome = PolicyOutcome {
            evaluated_count: decision.evaluated_count,
            evaluation_time_ms: decision.evaluation_time_ms,
        };

        if !decision.allowed {
            self.spawn_blocked_audit(blocked_tx_entry(
                &signer,
                input.signing_path,
                &transaction,
                &decoded,
                &decision,
                input.caller_ip.clone(),
            ));
            return Err(WardenError::PolicyBlocked(decision.violations));
        }

        let message_hash: [u8; 32] = keccak256(&unsigned).0;
        let eid = fresh_eid();
        let party_config = input.signing_path.party_config();

        let opened = match self
            .open_scheme_session(&signer, input.signing_path, message_hash, eid, &party_config)
            .await
        {
            Ok(opened) => opened,
            Err(e) => {
                self.write_audit(failed_entry(
                    &signer,
                    RequestType::SignTx,
                    input.signing_path,
                    outcome,
                    &e,
                    input.caller_ip.clone(),
                ))
                .await;
                return Err(e);
            }
        };

        let scheme_session_id = opened.created.session_id.clone();
        let state = SessionState {
            signer_id: signer.id.clone(),
            eth_address: signer.eth_address,
            owner_address: signer.owner_address,
            expected_public_key: opened.expected_public_key,
            signing_path: input.signing_path,
            server_key_material: opened.raw_material,
            policy_result: outcome,
            scheme_session_id: scheme_session_id.clone(),
            backend: opened.backend,
            message_hash,
            round: 0,
            caller_ip: input.caller_ip,
            kind: SessionKind::Transaction {
                transaction,
                decoded,
            },
        };

        match self.table.try_insert(state) {
            Ok(session_id) => Ok(CreateSessionOutput {
                session_id,
                server_first_messages: opened.created.first_messages,
                message_hash,
                eid,
                party_config,
                rounds_remaining: NOMINAL_SIGN_ROUNDS,
            }),
            Err(e) => {
                // The state (and its key material) was dropped and wiped;
                // the engine-side session still needs tearing down.
                opened.engine.destroy_session(&scheme_session_id).await;
                Err(e)
            }
        }
    }

    /// Opens a message-signing session. The hash comes from the peer, and
    /// an optional first peer message is processed inline.
    pub async fn create_message_session(
        &self,
        input: CreateMessageSessionInput,
    ) -> Result<CreateSessionOutput, WardenError> {
        if self.table.is_saturated() {
            return Err(WardenError::Saturated);
        }

        let signer = self.require_active_signer(&input.signer_id).await?;

        let ctx = self
            .gate
            .build_message_context(&signer, input.caller_ip.clone());
        let decision = self.gate.evaluate(&signer.id, &ctx).await?;
        let outcome = PolicyOutcome {
            evaluated_count: decision.evaluated_count,
            evaluation_time_ms: decision.evaluation_time_ms,
        };

        if !decision.allowed {
            self.spawn_blocked_audit(blocked_message_entry(
                &signer,
                input.signing_path,
                &decision,
                input.caller_ip.clone(),
            ));
            return Err(WardenError::PolicyBlocked(decision.violations));
        }

        let eid = fresh_eid();
        let party_config = input.signing_path.party_config();

        let mut opened = match self
            .open_scheme_session(
                &signer,
                input.signing_path,
                input.message_hash,
                eid,
                &party_config,
            )
            .await
        {
            Ok(opened) => opened,
            Err(e) => {
                self.write_audit(failed_entry(
                    &signer,
                    RequestType::SignMessage,
                    input.signing_path,
                    outcome,
                    &e,
                    input.caller_ip.clone(),
                ))
                .await;
                return Err(e);
            }
        };

        let mut first_messages = std::mem::take(&mut opened.created.first_messages);
        let mut round = 0u32;
        if let Some(first) = input.first_message {
            match opened
                .engine
                .process_sign_round(&opened.created.session_id, &[first])
                .await
            {
                Ok(output) => {
                    first_messages.extend(output.messages);
                    round = 1;
                }
                Err(e) => {
                    opened
                        .engine
                        .destroy_session(&opened.created.session_id)
                        .await;
                    opened.raw_material.wipe();
                    let err = WardenError::Scheme(e);
                    self.write_audit(failed_entry(
                        &signer,
                        RequestType::SignMessage,
                        input.signing_path,
                        outcome,
                        &err,
                        input.caller_ip.clone(),
                    ))
                    .await;
                    return Err(err);
                }
            }
        }

        let scheme_session_id = opened.created.session_id.clone();
        let state = SessionState {
            signer_id: signer.id.clone(),
            eth_address: signer.eth_address,
            owner_address: signer.owner_address,
            expected_public_key: opened.expected_public_key,
            signing_path: input.signing_path,
            server_key_material: opened.raw_material,
            policy_result: outcome,
            scheme_session_id: scheme_session_id.clone(),
            backend: opened.backend,
            message_hash: input.message_hash,
            round,
            caller_ip: input.caller_ip,
            kind: SessionKind::Message,
        };

        match self.table.try_insert(state) {
            Ok(session_id) => Ok(CreateSessionOutput {
                session_id,
                server_first_messages: first_messages,
                message_hash: input.message_hash,
                eid,
                party_config,
                rounds_remaining: NOMINAL_SIGN_ROUNDS,
            }),
            Err(e) => {
                opened.engine.destroy_session(&scheme_session_id).await;
                Err(e)
            }
        }
    }

    // ── Rounds ─────────────────────────────────────────────────────────

    /// Advances a session by one round of peer messages.
    pub async fn process_round(
        &self,
        input: ProcessRoundInput,
    ) -> Result<ProcessRoundOutput, WardenError> {
        let state_arc = self.fetch_live(&input.session_id).await?;
        let mut state = state_arc.lock().await;

        if state.signer_id != input.signer_id {
            return Err(WardenError::SessionOwnership);
        }
        self.ensure_signer_still_active(&input.session_id, &mut state)
            .await?;

        let engine = self.engine_by_backend(state.backend);
        match engine
            .process_sign_round(&state.scheme_session_id, &input.messages)
            .await
        {
            Ok(output) => {
                state.round += 1;
                let rounds_remaining = if output.complete {
                    0
                } else {
                    NOMINAL_SIGN_ROUNDS.saturating_sub(state.round).max(1)
                };
                Ok(ProcessRoundOutput {
                    messages: output.messages,
                    rounds_remaining,
                    complete: output.complete,
                })
            }
            Err(e) => {
                tracing::error!(session_id = %input.session_id, error = %e, "scheme round failed");
                self.destroy_locked(&input.session_id, &mut state).await;
                Err(WardenError::Scheme(e))
            }
        }
    }

    // ── Completion ─────────────────────────────────────────────────────

    /// Finalizes a transaction session: extract, recover, serialize,
    /// broadcast, audit, destroy.
    pub async fn complete_sign(
        &self,
        input: CompleteSignInput,
    ) -> Result<CompleteSignOutput, WardenError> {
        let state_arc = self.fetch_live(&input.session_id).await?;
        let mut state = state_arc.lock().await;

        if state.signer_id != input.signer_id {
            return Err(WardenError::SessionOwnership);
        }
        self.ensure_signer_still_active(&input.session_id, &mut state)
            .await?;

        if !matches!(state.kind, SessionKind::Transaction { .. }) {
            return Err(WardenError::WrongSessionKind("transaction"));
        }

        let signature = match self.extract_signature(&input.session_id, &mut state).await {
            Ok(signature) => signature,
            Err(e) => return Err(e),
        };

        let result = self.broadcast_and_audit(&mut state, signature).await;
        self.destroy_locked(&input.session_id, &mut state).await;
        result
    }

    /// Finalizes a message session: extract, recover, audit. No broadcast.
    pub async fn complete_message_sign(
        &self,
        input: CompleteSignInput,
    ) -> Result<MessageSignOutput, WardenError> {
        let state_arc = self.fetch_live(&input.session_id).await?;
        let mut state = state_arc.lock().await;

        if state.signer_id != input.signer_id {
            return Err(WardenError::SessionOwnership);
        }
        self.ensure_signer_still_active(&input.session_id, &mut state)
            .await?;

        if !matches!(state.kind, SessionKind::Message) {
            return Err(WardenError::WrongSessionKind("message"));
        }

        let signature = match self.extract_signature(&input.session_id, &mut state).await {
            Ok(signature) => signature,
            Err(e) => return Err(e),
        };

        let mut entry = entry_from_state(&state, AuditStatus::Approved, RequestType::SignMessage);
        entry.tx_hash = None;
        self.write_audit(entry).await;

        self.destroy_locked(&input.session_id, &mut state).await;
        Ok(MessageSignOutput { signature })
    }

    // ── Sweeper & shutdown ─────────────────────────────────────────────

    /// Spawns the background sweep destroying expired sessions.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.config.cleanup_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.sweep().await;
            }
        })
    }

    /// Destroys every expired session now.
    pub async fn sweep(&self) {
        let expired = self.table.take_expired();
        if expired.is_empty() {
            return;
        }
        tracing::debug!(count = expired.len(), "sweeping expired signing sessions");
        for state_arc in expired {
            let mut state = state_arc.lock().await;
            let scheme_session_id = state.scheme_session_id.clone();
            let backend = state.backend;
            state.wipe();
            drop(state);
            self.engine_by_backend(backend)
                .destroy_session(&scheme_session_id)
                .await;
        }
    }

    /// Destroys all sessions. Called on process shutdown.
    pub async fn shutdown(&self) {
        for state_arc in self.table.drain_all() {
            let mut state = state_arc.lock().await;
            let scheme_session_id = state.scheme_session_id.clone();
            let backend = state.backend;
            state.wipe();
            drop(state);
            self.engine_by_backend(backend)
                .destroy_session(&scheme_session_id)
                .await;
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    async fn require_active_signer(&self, id: &str) -> Result<Signer, WardenError> {
        let signer = self
            .signers
            .find_by_id(id)
            .await?
            .ok_or_else(|| WardenError::SignerNotFound(id.into()))?;
        if !signer.is_active() {
            return Err(WardenError::SignerNotActive(signer.status));
        }
        Ok(signer)
    }

    /// Re-checks the signer mid-session; pause/revoke destroys the session.
    async fn ensure_signer_still_active(
        &self,
        session_id: &Uuid,
        state: &mut SessionState,
    ) -> Result<(), WardenError> {
        match self.signers.find_by_id(&state.signer_id).await? {
            Some(signer) if signer.is_active() => Ok(()),
            Some(signer) => {
                self.destroy_locked(session_id, state).await;
                Err(WardenError::SignerNotActive(signer.status))
            }
            None => {
                self.destroy_locked(session_id, state).await;
                Err(WardenError::SignerNotFound(state.signer_id.clone()))
            }
        }
    }

    fn engine_for(&self, path: SigningPath) -> (Arc<dyn SchemeEngine>, SchemeBackend) {
        if path.requires_wasm_backend() {
            // The browser peer runs the WASM arithmetic; cross-backend
            // messages are not interoperable, so force it here.
            return (self.wasm_engine.clone(), SchemeBackend::WasmCompatible);
        }
        match &self.native_engine {
            Some(native) => (native.clone(), SchemeBackend::Native),
            None => (self.wasm_engine.clone(), SchemeBackend::WasmCompatible),
        }
    }

    fn engine_by_backend(&self, backend: SchemeBackend) -> Arc<dyn SchemeEngine> {
        match backend {
            SchemeBackend::Native => self
                .native_engine
                .clone()
                .unwrap_or_else(|| self.wasm_engine.clone()),
            SchemeBackend::WasmCompatible => self.wasm_engine.clone(),
        }
    }

    async fn fetch_live(
        &self,
        id: &Uuid,
    ) -> Result<Arc<Mutex<SessionState>>, WardenError> {
        match self.table.lookup(id) {
            Lookup::Live(state) => Ok(state),
            Lookup::Expired(state_arc) => {
                let mut state = state_arc.lock().await;
                let scheme_session_id = state.scheme_session_id.clone();
                let backend = state.backend;
                state.wipe();
                drop(state);
                self.engine_by_backend(backend)
                    .destroy_session(&scheme_session_id)
                    .await;
                Err(WardenError::SessionExpired)
            }
            Lookup::Missing => Err(WardenError::SessionNotFound(id.to_string())),
        }
    }

    /// Removes the session from the table, wipes its secrets, and tears
    /// down the engine-side state. Idempotent.
    async fn destroy_locked(&self, id: &Uuid, state: &mut SessionState) {
        self.table.remove(id);
        let scheme_session_id = state.scheme_session_id.clone();
        let backend = state.backend;
        state.wipe();
        self.engine_by_backend(backend)
            .destroy_session(&scheme_session_id)
            .await;
    }

    /// Loads key material, extracts the expected public key, and opens the
    /// scheme session. Wipes everything on every failure path.
    async fn open_scheme_session(
        &self,
        signer: &Signer,
        path: SigningPath,
        message_hash: [u8; 32],
        eid: [u8; 32],
        party_config: &PartyConfig,
    ) -> Result<OpenedSession, WardenError> {
        let raw = self.shares.get_share(&signer.share_path).await?;
        let mut raw_material = SecretBuffer::from_zeroizing(raw);

        let mut material = match KeyMaterial::parse(raw_material.as_slice()) {
            Ok(material) => material,
            Err(e) => {
                raw_material.wipe();
                return Err(e.into());
            }
        };

        let (engine, backend) = self.engine_for(path);

        // A share we cannot read a public key out of cannot be verified at
        // finalize time; fail here rather than sign blind.
        let expected_public_key =
            match engine.extract_public_key(material.core_share.as_slice()) {
                Ok(pk) => pk,
                Err(e) => {
                    material.wipe();
                    raw_material.wipe();
                    return Err(e.into());
                }
            };

        let created = match engine
            .create_sign_session(CreateSignSession {
                core_share: material.core_share.as_slice(),
                aux_info: material.aux_info.as_slice(),
                message_hash,
                party_index: party_config.server_party_index,
                parties_at_keygen: &party_config.parties_at_keygen,
                eid,
            })
            .await
        {
            Ok(created) => created,
            Err(e) => {
                material.wipe();
                raw_material.wipe();
                return Err(WardenError::Scheme(e));
            }
        };

        // The engine now holds its internal form; drop the parsed copies.
        material.wipe();

        Ok(OpenedSession {
            raw_material,
            expected_public_key,
            engine,
            backend,
            created,
        })
    }

    /// Extracts `(r, s)` from the completed scheme session and derives the
    /// recovery id. Destroys the session (and audits FAILED) on error.
    async fn extract_signature(
        &self,
        session_id: &Uuid,
        state: &mut SessionState,
    ) -> Result<EthSignature, WardenError> {
        let engine = self.engine_by_backend(state.backend);
        let raw = match engine.finalize_sign(&state.scheme_session_id).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "finalize failed");
                let err = WardenError::Scheme(e);
                let request_type = request_type_of(state);
                let mut entry = entry_from_state(state, AuditStatus::Failed, request_type);
                entry.error = Some(err.to_string());
                self.write_audit(entry).await;
                self.destroy_locked(session_id, state).await;
                return Err(err);
            }
        };

        match compute_recovery_id(
            &raw.r,
            &raw.s,
            &state.message_hash,
            &state.expected_public_key,
        ) {
            Ok(v) => Ok(EthSignature {
                r: raw.r.into(),
                s: raw.s.into(),
                v,
            }),
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "recovery id mismatch");
                let err = WardenError::Crypto(e);
                let request_type = request_type_of(state);
                let mut entry = entry_from_state(state, AuditStatus::Failed, request_type);
                entry.error = Some(err.to_string());
                self.write_audit(entry).await;
                self.destroy_locked(session_id, state).await;
                Err(err)
            }
        }
    }

    /// Serializes, broadcasts, and audits a completed transaction session.
    /// The caller destroys the session afterwards in all cases.
    async fn broadcast_and_audit(
        &self,
        state: &mut SessionState,
        signature: EthSignature,
    ) -> Result<CompleteSignOutput, WardenError> {
        let SessionKind::Transaction { transaction, .. } = &state.kind else {
            return Err(WardenError::WrongSessionKind("transaction"));
        };

        let chain = self.chains.get(transaction.chain_id)?;
        let unsigned = chain.build_transaction(transaction)?;
        let signed = chain.serialize_signed_transaction(&unsigned, &signature)?;

        match chain.broadcast_transaction(&signed).await {
            Ok(tx_hash) => {
                let mut entry =
                    entry_from_state(state, AuditStatus::Approved, RequestType::SignTx);
                entry.tx_hash = Some(tx_hash);
                self.write_audit(entry).await;
                Ok(CompleteSignOutput { tx_hash, signature })
            }
            Err(e) => {
                // The signature exists; record it for incident response
                // (it is public data once broadcast anywhere).
                tracing::error!(
                    r = %hex::encode(signature.r),
                    s = %hex::encode(signature.s),
                    v = signature.v,
                    error = %e,
                    "broadcast failed after signature extraction"
                );
                let mut entry =
                    entry_from_state(state, AuditStatus::Failed, RequestType::SignTx);
                entry.error = Some(format!(
                    "broadcast failed: {e}; signature r=0x{} s=0x{} v={}",
                    hex::encode(signature.r),
                    hex::encode(signature.s),
                    signature.v
                ));
                self.write_audit(entry).await;
                Err(WardenError::Chain(e))
            }
        }
    }

    /// BLOCKED entries are fire-and-forget; a failed write is logged and
    /// never fails the request path.
    fn spawn_blocked_audit(&self, entry: AuditEntry) {
        let audit = self.audit.clone();
        tokio::spawn(async move {
            if let Err(e) = audit.create(entry).await {
                tracing::error!(error = %e, "failed to write BLOCKED audit entry");
            }
        });
    }

    /// APPROVED/FAILED entries are awaited; a failed write is logged and
    /// never aborts the operation.
    async fn write_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.create(entry).await {
            tracing::error!(error = %e, "failed to write audit entry");
        }
    }
}

struct OpenedSession {
    raw_material: SecretBuffer,
    expected_public_key: [u8; 33],
    engine: Arc<dyn SchemeEngine>,
    backend: SchemeBackend,
    created: CreatedSession,
}

fn fresh_eid() -> [u8; 32] {
    let mut eid = [0u8; 32];
    OsRng.fill_bytes(&mut eid);
    eid
}

fn request_type_of(state: &SessionState) -> RequestType {
    match state.kind {
        SessionKind::Transaction { .. } => RequestType::SignTx,
        SessionKind::Message => RequestType::SignMessage,
    }
}

fn entry_from_state(
    state: &SessionState,
    status: AuditStatus,
    request_type: RequestType,
) -> AuditEntry {
    let (to_address, value_wei, chain_id, function_name) = match &state.kind {
        SessionKind::Transaction {
            transaction,
            decoded,
        } => (
            decoded.to.or(Some(transaction.to)),
            transaction.value,
            transaction.chain_id,
            decoded.function_name.clone(),
        ),
        SessionKind::Message => (None, alloy_primitives::U256::ZERO, 0, None),
    };

    AuditEntry {
        signer_id: state.signer_id.clone(),
        owner_address: state.owner_address,
        request_type,
        status,
        signing_path: state.signing_path,
        to_address,
        value_wei,
        chain_id,
        tx_hash: None,
        function_name,
        policies_evaluated: state.policy_result.evaluated_count,
        evaluation_time_ms: state.policy_result.evaluation_time_ms,
        violations: Vec::new(),
        error: None,
        caller_ip: state.caller_ip.clone(),
        created_at_ms: AuditEntry::now_ms(),
    }
}

fn blocked_tx_entry(
    signer: &Signer,
    signing_path: SigningPath,
    transaction: &warden_types::tx::PopulatedTransaction,
    decoded: &warden_types::tx::DecodedTransaction,
    decision: &PolicyDecision,
    caller_ip: Option<String>,
) -> AuditEntry {
    AuditEntry {
        signer_id: signer.id.clone(),
        owner_address: signer.owner_address,
        request_type: RequestType::SignTx,
        status: AuditStatus::Blocked,
        signing_path,
        to_address: decoded.to.or(Some(transaction.to)),
        value_wei: transaction.value,
        chain_id: transaction.chain_id,
        tx_hash: None,
        function_name: decoded.function_name.clone(),
        policies_evaluated: decision.evaluated_count,
        evaluation_time_ms: decision.evaluation_time_ms,
        violations: decision.violations.clone(),
        error: None,
        caller_ip,
        created_at_ms: AuditEntry::now_ms(),
    }
}

fn blocked_message_entry(
    signer: &Signer,
    signing_path: SigningPath,
    decision: &PolicyDecision,
    caller_ip: Option<String>,
) -> AuditEntry {
    AuditEntry {
        signer_id: signer.id.clone(),
        owner_address: signer.owner_address,
        request_type: RequestType::SignMessage,
        status: AuditStatus::Blocked,
        signing_path,
        to_address: None,
        value_wei: alloy_primitives::U256::ZERO,
        chain_id: 0,
        tx_hash: None,
        function_name: None,
        policies_evaluated: decision.evaluated_count,
        evaluation_time_ms: decision.evaluation_time_ms,
        violations: decision.violations.clone(),
        error: None,
        caller_ip,
        created_at_ms: AuditEntry::now_ms(),
    }
}

fn failed_entry(
    signer: &Signer,
    request_type: RequestType,
    signing_path: SigningPath,
    outcome: PolicyOutcome,
    error: &WardenError,
    caller_ip: Option<String>,
) -> AuditEntry {
    AuditEntry {
        signer_id: signer.id.clone(),
        owner_address: signer.owner_address,
        request_type,
        status: AuditStatus::Failed,
        signing_path,
        to_address: None,
        value_wei: alloy_primitives::U256::ZERO,
        chain_id: 0,
        tx_hash: None,
        function_name: None,
        policies_evaluated: outcome.evaluated_count,
        evaluation_time_ms: outcome.evaluation_time_ms,
        violations: Vec::new(),
        error: Some(error.to_string()),
        caller_ip,
        created_at_ms: AuditEntry::now_ms(),
    }
}
