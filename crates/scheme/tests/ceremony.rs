// Path: crates/scheme/tests/ceremony.rs
//! Full DKG + two-party signing ceremony against the real CGGMP24 stack.
//!
//! Generating Paillier primes for three parties takes minutes, so these
//! run behind `--ignored` (e.g. in a nightly job); the coordinator suite
//! covers the same flow against the mock engine on every run.

use warden_api::scheme::{CreateSignSession, SchemeEngine};
use warden_crypto::recovery::compute_recovery_id;
use warden_scheme::{dkg, Cggmp24Engine};

#[tokio::test]
#[ignore = "generates Paillier primes for three parties; takes minutes"]
async fn dkg_then_two_party_signing_produces_a_recoverable_signature() {
    let ceremony_eid = [0x11u8; 32];
    let output = dkg::run(&ceremony_eid, 3, 2).expect("dkg ceremony");
    assert_eq!(output.shares.len(), 3);
    assert!(output.public_key[0] == 0x02 || output.public_key[0] == 0x03);

    let engine = Cggmp24Engine::new();
    let message_hash = [0x42u8; 32];
    let signing_eid = [0x22u8; 32];
    let parties = [0u16, 1u16];

    // Party 0 (signer) and party 1 (server), same ceremony.
    let a = engine
        .create_sign_session(CreateSignSession {
            core_share: output.shares[0].core_share.as_slice(),
            aux_info: output.shares[0].aux_info.as_slice(),
            message_hash,
            party_index: 0,
            parties_at_keygen: &parties,
            eid: signing_eid,
        })
        .await
        .expect("party 0 session");
    let b = engine
        .create_sign_session(CreateSignSession {
            core_share: output.shares[1].core_share.as_slice(),
            aux_info: output.shares[1].aux_info.as_slice(),
            message_hash,
            party_index: 1,
            parties_at_keygen: &parties,
            eid: signing_eid,
        })
        .await
        .expect("party 1 session");

    let mut to_a = b.first_messages;
    let mut to_b = a.first_messages;
    let mut a_done = false;
    let mut b_done = false;

    for _ in 0..16 {
        let round_a = engine
            .process_sign_round(&a.session_id, &to_a)
            .await
            .expect("party 0 round");
        let round_b = engine
            .process_sign_round(&b.session_id, &to_b)
            .await
            .expect("party 1 round");

        a_done = round_a.complete;
        b_done = round_b.complete;
        to_a = round_b.messages;
        to_b = round_a.messages;

        if a_done && b_done {
            break;
        }
    }
    assert!(a_done && b_done, "protocol did not complete in 16 rounds");

    let sig_a = engine.finalize_sign(&a.session_id).await.expect("sig a");
    let sig_b = engine.finalize_sign(&b.session_id).await.expect("sig b");
    assert_eq!(sig_a, sig_b, "parties disagree on the signature");

    // The signature must recover to the ceremony's shared public key.
    let v = compute_recovery_id(&sig_a.r, &sig_a.s, &message_hash, &output.public_key)
        .expect("recovery id");
    assert!(v == 27 || v == 28);

    engine.destroy_session(&a.session_id).await;
    engine.destroy_session(&b.session_id).await;
    assert_eq!(engine.session_count(), 0);
}

#[test]
fn extract_public_key_rejects_garbage() {
    let err = warden_scheme::engine::extract_public_key_bytes(b"not a key share");
    assert!(err.is_err());
}
