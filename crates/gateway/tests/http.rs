// Path: crates/gateway/tests/http.rs
//! The peer transport contract, exercised over the axum router.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use warden_coordinator::rules::RulesEvaluator;
use warden_coordinator::coordinator::CoordinatorDeps;
use warden_coordinator::{CoordinatorConfig, SigningCoordinator};
use warden_test_utils::{
    mock_share_file, test_signer, InMemoryAuditRepo, InMemoryPolicyRepo, InMemoryShareStore,
    InMemorySignerRepo, MockChain, MockSchemeEngine,
};
use warden_types::policy::{DefaultPolicy, Rule, RuleAction, RuleConditions, RulesDocument};

const SEED: [u8; 32] = {
    let mut seed = [0u8; 32];
    seed[31] = 7;
    seed
};
const SIGNER: &str = "signer-1";
const CHAIN_ID: u64 = 11155111;

fn app() -> (Router, Arc<InMemoryPolicyRepo>) {
    let signers = Arc::new(InMemorySignerRepo::new());
    let audit = Arc::new(InMemoryAuditRepo::new());
    let policies = Arc::new(InMemoryPolicyRepo::new());
    let shares = Arc::new(InMemoryShareStore::new());
    let engine = Arc::new(MockSchemeEngine::new());
    let chain = Arc::new(MockChain::new(CHAIN_ID));

    let share_path = PathBuf::from("/shares/signer-1.json");
    signers.insert(test_signer(SIGNER, &SEED, share_path.clone()));
    shares.put(share_path, mock_share_file(&SEED));

    let mut registry = warden_api::chain::ChainRegistry::new();
    registry.register(chain);

    let coordinator = Arc::new(SigningCoordinator::new(
        CoordinatorDeps {
            signers,
            shares,
            audit,
            policies: policies.clone(),
            rules: Arc::new(RulesEvaluator::new()),
            chains: Arc::new(registry),
            wasm_engine: engine,
            native_engine: None,
        },
        CoordinatorConfig::default(),
    ));

    (warden_gateway::router(coordinator), policies)
}

async fn post(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn create_body() -> Value {
    json!({
        "transaction": {
            "to": "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
            "value": "10000000000000000",
            "chainId": CHAIN_ID,
        }
    })
}

#[tokio::test]
async fn create_session_returns_the_full_envelope() {
    let (router, _) = app();
    let (status, body) = post(&router, "/signers/signer-1/sign/session", create_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["sessionId"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());
    assert!(!body["serverFirstMessages"].as_array().unwrap().is_empty());
    assert_eq!(body["roundsRemaining"], 4);
    assert_eq!(body["partyConfig"]["serverPartyIndex"], 1);
    assert_eq!(body["partyConfig"]["clientPartyIndex"], 0);
    assert_eq!(body["partyConfig"]["partiesAtKeygen"], json!([0, 1]));

    use base64::Engine as _;
    let hash = base64::engine::general_purpose::STANDARD
        .decode(body["messageHash"].as_str().unwrap())
        .unwrap();
    assert_eq!(hash.len(), 32);
    let eid = base64::engine::general_purpose::STANDARD
        .decode(body["eid"].as_str().unwrap())
        .unwrap();
    assert_eq!(eid.len(), 32);
}

#[tokio::test]
async fn full_signing_flow_over_http() {
    let (router, _) = app();
    let (_, created) = post(&router, "/signers/signer-1/sign/session", create_body()).await;
    let session_id = created["sessionId"].as_str().unwrap().to_string();

    let (status, round1) = post(
        &router,
        "/signers/signer-1/sign/round",
        json!({ "sessionId": session_id, "messages": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round1["complete"], false);
    assert_eq!(round1["roundsRemaining"], 3);

    let (_, round2) = post(
        &router,
        "/signers/signer-1/sign/round",
        json!({ "sessionId": session_id, "messages": [] }),
    )
    .await;
    assert_eq!(round2["complete"], true);
    assert_eq!(round2["roundsRemaining"], 0);

    let (status, completed) = post(
        &router,
        "/signers/signer-1/sign/complete",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(completed["txHash"].as_str().unwrap().starts_with("0x"));
    let signature = &completed["signature"];
    assert!(signature["r"].as_str().unwrap().starts_with("0x"));
    assert_eq!(signature["r"].as_str().unwrap().len(), 66);
    assert!(signature["s"].as_str().unwrap().starts_with("0x"));
    let v = signature["v"].as_u64().unwrap();
    assert!(v == 27 || v == 28);

    // One completion opportunity: the session is gone afterwards.
    let (status, _) = post(
        &router,
        "/signers/signer-1/sign/complete",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn policy_block_is_403_with_violations() {
    let (router, policies) = app();
    policies.set_rules(
        SIGNER,
        RulesDocument {
            policy_id: "tiny-cap".into(),
            defaults: DefaultPolicy::DenyAll,
            rules: vec![Rule {
                rule_id: Some("one-wei".into()),
                conditions: RuleConditions {
                    max_value_wei: Some(alloy_primitives::U256::from(1u64)),
                    ..Default::default()
                },
                action: RuleAction::Allow,
            }],
        },
    );

    let mut body = create_body();
    body["transaction"]["value"] = json!("2");

    let (status, response) = post(&router, "/signers/signer-1/sign/session", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["message"], "Transaction blocked by policy");
    assert_eq!(response["code"], "POLICY_BLOCKED");
    assert!(!response["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_signer_is_404() {
    let (router, _) = app();
    let (status, body) = post(&router, "/signers/ghost/sign/session", create_body()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SIGNER_NOT_FOUND");
}

#[tokio::test]
async fn malformed_value_is_400() {
    let (router, _) = app();
    let mut body = create_body();
    body["transaction"]["value"] = json!("not-a-number");

    let (status, response) = post(&router, "/signers/signer-1/sign/session", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn message_flow_has_no_tx_hash() {
    let (router, _) = app();
    use base64::Engine as _;
    let hash_b64 = base64::engine::general_purpose::STANDARD.encode([0x5Au8; 32]);

    let (status, created) = post(
        &router,
        "/signers/signer-1/sign-message/session",
        json!({ "messageHash": hash_b64 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = created["sessionId"].as_str().unwrap().to_string();
    assert_eq!(created["messageHash"].as_str().unwrap(), hash_b64);

    for _ in 0..2 {
        post(
            &router,
            "/signers/signer-1/sign-message/round",
            json!({ "sessionId": session_id, "messages": [] }),
        )
        .await;
    }

    let (status, completed) = post(
        &router,
        "/signers/signer-1/sign-message/complete",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(completed.get("txHash").is_none());
    assert!(completed["signature"]["r"].as_str().is_some());
}
