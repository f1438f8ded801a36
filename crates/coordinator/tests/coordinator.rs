// Path: crates/coordinator/tests/coordinator.rs
//! End-to-end coordinator scenarios against the mock engine and chain.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{address, U256};

use warden_coordinator::rules::RulesEvaluator;
use warden_coordinator::{
    CompleteSignInput, CoordinatorConfig, CreateMessageSessionInput, CreateTxSessionInput,
    ProcessRoundInput, SigningCoordinator,
};
use warden_api::scheme::SchemeBackend;
use warden_coordinator::coordinator::CoordinatorDeps;
use warden_crypto::recovery::compute_recovery_id;
use warden_test_utils::{
    mock_share_file, pubkey_of_seed, test_signer, InMemoryAuditRepo, InMemoryPolicyRepo,
    InMemoryShareStore, InMemorySignerRepo, MockChain, MockSchemeEngine,
};
use warden_types::audit::AuditStatus;
use warden_types::error::WardenError;
use warden_types::policy::{
    DefaultPolicy, Rule, RuleAction, RuleConditions, RulesDocument,
};
use warden_types::session::SigningPath;
use warden_types::signer::SignerStatus;
use warden_types::tx::TransactionRequest;

const SEED: [u8; 32] = {
    let mut seed = [0u8; 32];
    seed[31] = 7;
    seed
};
const SIGNER: &str = "signer-1";
const CHAIN_ID: u64 = 11155111;

struct Harness {
    coordinator: Arc<SigningCoordinator>,
    signers: Arc<InMemorySignerRepo>,
    audit: Arc<InMemoryAuditRepo>,
    policies: Arc<InMemoryPolicyRepo>,
    engine: Arc<MockSchemeEngine>,
    native: Arc<MockSchemeEngine>,
    chain: Arc<MockChain>,
}

fn harness_with(config: CoordinatorConfig) -> Harness {
    let signers = Arc::new(InMemorySignerRepo::new());
    let audit = Arc::new(InMemoryAuditRepo::new());
    let policies = Arc::new(InMemoryPolicyRepo::new());
    let shares = Arc::new(InMemoryShareStore::new());
    let engine = Arc::new(MockSchemeEngine::new());
    let native = Arc::new(MockSchemeEngine::new().with_backend(SchemeBackend::Native));
    let chain = Arc::new(MockChain::new(CHAIN_ID));

    let share_path = PathBuf::from("/shares/signer-1.json");
    signers.insert(test_signer(SIGNER, &SEED, share_path.clone()));
    shares.put(share_path, mock_share_file(&SEED));

    let mut registry = warden_api::chain::ChainRegistry::new();
    registry.register(chain.clone());

    let coordinator = Arc::new(SigningCoordinator::new(
        CoordinatorDeps {
            signers: signers.clone(),
            shares,
            audit: audit.clone(),
            policies: policies.clone(),
            rules: Arc::new(RulesEvaluator::new()),
            chains: Arc::new(registry),
            wasm_engine: engine.clone(),
            native_engine: Some(native.clone()),
        },
        config,
    ));

    Harness {
        coordinator,
        signers,
        audit,
        policies,
        engine,
        native,
        chain,
    }
}

fn harness() -> Harness {
    harness_with(CoordinatorConfig::default())
}

fn sample_request() -> TransactionRequest {
    TransactionRequest {
        to: address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
        value: Some(U256::from(10_000_000_000_000_000u64)),
        chain_id: CHAIN_ID,
        ..Default::default()
    }
}

fn create_input() -> CreateTxSessionInput {
    CreateTxSessionInput {
        signer_id: SIGNER.into(),
        transaction: sample_request(),
        signing_path: SigningPath::SignerServer,
        caller_ip: Some("203.0.113.9".into()),
    }
}

async fn drive_to_complete(h: &Harness, session_id: uuid::Uuid) {
    // The mock completes after two rounds.
    for _ in 0..2 {
        h.coordinator
            .process_round(ProcessRoundInput {
                session_id,
                signer_id: SIGNER.into(),
                messages: Vec::new(),
            })
            .await
            .expect("round");
    }
}

#[tokio::test]
async fn happy_path_signs_broadcasts_and_destroys() {
    let h = harness();

    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");
    assert!(!created.server_first_messages.is_empty());
    assert_eq!(created.rounds_remaining, 4);
    assert_eq!(created.party_config.server_party_index, 1);
    assert_eq!(created.party_config.parties_at_keygen, vec![0, 1]);

    let first = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("round 1");
    assert!(!first.complete);
    assert_eq!(first.rounds_remaining, 3);

    let second = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("round 2");
    assert!(second.complete);
    assert_eq!(second.rounds_remaining, 0);

    let completed = h
        .coordinator
        .complete_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .expect("complete");

    // The signature recovers to the signer's public key over the
    // create-time hash.
    let sig = completed.signature;
    let v = compute_recovery_id(
        &sig.r.0,
        &sig.s.0,
        &created.message_hash,
        &pubkey_of_seed(&SEED),
    )
    .expect("recoverable");
    assert_eq!(v, sig.v);

    // Broadcast happened and was audited APPROVED with the tx hash.
    assert_eq!(h.chain.broadcasts().len(), 1);
    let approved = h.audit.entries_with_status(AuditStatus::Approved);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].tx_hash, Some(completed.tx_hash));
    assert_eq!(approved[0].signer_id, SIGNER);

    // The session is gone, server-side and engine-side.
    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);
    let gone = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(gone, WardenError::SessionNotFound(_)));
}

#[tokio::test]
async fn policy_deny_blocks_audits_and_creates_nothing() {
    let h = harness();
    h.policies.set_rules(
        SIGNER,
        RulesDocument {
            policy_id: "tiny-cap".into(),
            defaults: DefaultPolicy::DenyAll,
            rules: vec![Rule {
                rule_id: Some("one-wei".into()),
                conditions: RuleConditions {
                    max_value_wei: Some(U256::from(1u64)),
                    ..Default::default()
                },
                action: RuleAction::Allow,
            }],
        },
    );

    let mut input = create_input();
    input.transaction.value = Some(U256::from(2u64));

    let err = h.coordinator.create_tx_session(input).await.unwrap_err();
    let WardenError::PolicyBlocked(violations) = err else {
        panic!("expected policy block");
    };
    assert!(violations
        .iter()
        .any(|v| v.violation_type == "MAX_VALUE_EXCEEDED"));

    // No session, no engine state.
    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);

    // The BLOCKED entry is written asynchronously.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let blocked = h.audit.entries_with_status(AuditStatus::Blocked);
    assert_eq!(blocked.len(), 1);
    assert!(!blocked[0].violations.is_empty());
}

#[tokio::test]
async fn expired_session_is_destroyed_on_access() {
    let h = harness_with(CoordinatorConfig {
        session_ttl: Duration::ZERO,
        ..Default::default()
    });

    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");

    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::SessionExpired));

    // Entry and engine state are gone; a second access misses entirely.
    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);
    let err = h
        .coordinator
        .complete_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::SessionNotFound(_)));
}

#[tokio::test]
async fn capacity_cap_rejects_with_no_side_effects() {
    let h = harness_with(CoordinatorConfig {
        max_sessions: 1,
        ..Default::default()
    });

    h.coordinator
        .create_tx_session(create_input())
        .await
        .expect("first create fits");

    let err = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Saturated));
    assert_eq!(err.to_string(), "Too many concurrent signing sessions");

    assert_eq!(h.coordinator.active_sessions(), 1);
    // A capacity rejection is a precondition: no FAILED audit entry.
    assert!(h.audit.entries_with_status(AuditStatus::Failed).is_empty());
}

#[tokio::test]
async fn round_from_the_wrong_signer_is_rejected_and_session_survives() {
    let h = harness();
    h.signers.insert(test_signer(
        "signer-2",
        &{
            let mut seed = [0u8; 32];
            seed[31] = 9;
            seed
        },
        PathBuf::from("/shares/signer-2.json"),
    ));

    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");

    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: "signer-2".into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::SessionOwnership));
    assert_eq!(err.to_string(), "Session does not belong to this signer");

    // The rightful owner can still drive the session.
    h.coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("legitimate round still works");
}

#[tokio::test]
async fn pausing_the_signer_mid_session_tears_it_down() {
    let h = harness();
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");

    h.signers.set_status(SIGNER, SignerStatus::Paused);

    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Signer is paused");

    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);
}

#[tokio::test]
async fn scheme_round_failure_destroys_the_session() {
    let h = harness();
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");

    h.engine.fail_next_round();
    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Scheme(_)));

    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);
}

#[tokio::test]
async fn broadcast_failure_audits_failed_and_returns_error() {
    let h = harness();
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");
    drive_to_complete(&h, created.session_id).await;

    h.chain.fail_broadcasts();
    let err = h
        .coordinator
        .complete_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Chain(_)));

    let failed = h.audit.entries_with_status(AuditStatus::Failed);
    assert_eq!(failed.len(), 1);
    // Signature details land in the audit trail for incident response.
    assert!(failed[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("broadcast failed") && e.contains("r=0x")));

    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.engine.live_sessions(), 0);
}

#[tokio::test]
async fn message_session_signs_without_broadcasting() {
    let h = harness();
    let message_hash = [0x5Au8; 32];

    // With the native helper configured, a signer+server ceremony runs on
    // the native backend, so the peer's traffic is native-encoded too.
    let created = h
        .coordinator
        .create_message_session(CreateMessageSessionInput {
            signer_id: SIGNER.into(),
            message_hash,
            first_message: Some(MockSchemeEngine::peer_message(SchemeBackend::Native, 0, 0)),
            signing_path: SigningPath::SignerServer,
            caller_ip: None,
        })
        .await
        .expect("create");
    assert_eq!(created.message_hash, message_hash);

    // The peer's first message was processed inline (one mock round),
    // so one more round completes.
    let round = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("round");
    assert!(round.complete);

    let output = h
        .coordinator
        .complete_message_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .expect("complete");

    let v = compute_recovery_id(
        &output.signature.r.0,
        &output.signature.s.0,
        &message_hash,
        &pubkey_of_seed(&SEED),
    )
    .expect("recoverable");
    assert_eq!(v, output.signature.v);

    // No broadcast for messages; audit is APPROVED as a message signing.
    assert!(h.chain.broadcasts().is_empty());
    let approved = h.audit.entries_with_status(AuditStatus::Approved);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].tx_hash, None);
    assert_eq!(approved[0].chain_id, 0);
}

#[tokio::test]
async fn completing_a_message_session_as_a_tx_is_rejected() {
    let h = harness();
    let created = h
        .coordinator
        .create_message_session(CreateMessageSessionInput {
            signer_id: SIGNER.into(),
            message_hash: [1u8; 32],
            first_message: None,
            signing_path: SigningPath::SignerServer,
            caller_ip: None,
        })
        .await
        .expect("create");

    let err = h
        .coordinator
        .complete_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::WrongSessionKind("transaction")));
    // The misdirected call does not destroy the session.
    assert_eq!(h.coordinator.active_sessions(), 1);
}

#[tokio::test]
async fn empty_round_still_advances_the_round_counter() {
    let h = harness();
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");

    let one = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("round 1");
    assert_eq!(one.rounds_remaining, 3);

    let two = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .expect("round 2");
    // The mock completes on the second delivery.
    assert!(two.complete);
    assert_eq!(two.rounds_remaining, 0);
}

#[tokio::test]
async fn audit_write_failure_never_aborts_signing() {
    let h = harness();
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");
    drive_to_complete(&h, created.session_id).await;

    h.audit.fail_writes(true);
    h.coordinator
        .complete_sign(CompleteSignInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
        })
        .await
        .expect("signing succeeds despite the audit outage");
}

#[tokio::test]
async fn missing_share_fails_create_with_a_failed_audit_entry() {
    let h = harness();
    h.signers.insert(test_signer(
        "signer-unshared",
        &SEED,
        PathBuf::from("/shares/nowhere.json"),
    ));

    let mut input = create_input();
    input.signer_id = "signer-unshared".into();

    let err = h.coordinator.create_tx_session(input).await.unwrap_err();
    assert!(matches!(err, WardenError::Store(_)));

    let failed = h.audit.entries_with_status(AuditStatus::Failed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].signer_id, "signer-unshared");
    assert_eq!(h.coordinator.active_sessions(), 0);
}

#[tokio::test]
async fn unknown_signer_and_unknown_session_are_not_found() {
    let h = harness();

    let mut input = create_input();
    input.signer_id = "ghost".into();
    let err = h.coordinator.create_tx_session(input).await.unwrap_err();
    assert!(matches!(err, WardenError::SignerNotFound(_)));

    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: uuid::Uuid::new_v4(),
            signer_id: SIGNER.into(),
            messages: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::SessionNotFound(_)));
}

#[tokio::test]
async fn missing_chain_id_is_rejected_before_any_work() {
    let h = harness();
    let mut input = create_input();
    input.transaction.chain_id = 0;

    let err = h.coordinator.create_tx_session(input).await.unwrap_err();
    assert!(matches!(err, WardenError::MissingChainId));
    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn browser_path_always_lands_on_the_wasm_backend() {
    let h = harness();

    // signer+server may use the native helper when configured...
    h.coordinator
        .create_tx_session(create_input())
        .await
        .expect("create signer+server");
    assert_eq!(h.native.live_sessions(), 1);
    assert_eq!(h.engine.live_sessions(), 0);

    // ...but the browser peer cannot run GMP arithmetic, and protocol
    // messages are not interoperable across backends.
    let mut input = create_input();
    input.signing_path = SigningPath::UserServer;
    h.coordinator
        .create_tx_session(input)
        .await
        .expect("create user+server");
    assert_eq!(h.native.live_sessions(), 1);
    assert_eq!(h.engine.live_sessions(), 1);
}

#[tokio::test]
async fn cross_backend_message_fails_the_round_loudly() {
    let h = harness();

    // This session runs on the native backend (helper configured).
    let created = h
        .coordinator
        .create_tx_session(create_input())
        .await
        .expect("create");
    assert_eq!(h.native.live_sessions(), 1);

    // A peer speaking the WASM-compatible encoding cannot be parsed by
    // the native arithmetic: the round must fail, not limp along.
    let foreign = MockSchemeEngine::peer_message(SchemeBackend::WasmCompatible, 0, 0);
    let err = h
        .coordinator
        .process_round(ProcessRoundInput {
            session_id: created.session_id,
            signer_id: SIGNER.into(),
            messages: vec![foreign],
        })
        .await
        .unwrap_err();

    let WardenError::Scheme(scheme_err) = &err else {
        panic!("expected a scheme error, got {err}");
    };
    assert!(
        scheme_err.to_string().contains("bigint"),
        "error should name the mismatched encoding: {scheme_err}"
    );

    // The failed ceremony is torn down on both sides.
    assert_eq!(h.coordinator.active_sessions(), 0);
    assert_eq!(h.native.live_sessions(), 0);
}
