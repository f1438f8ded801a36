// Path: crates/gateway/src/lib.rs
#![forbid(unsafe_code)]

//! # Warden Gateway
//!
//! The REST surface the second signing party talks to: three idempotent
//! exchanges per flavor (`session`, `round`, `complete`), scoped to a
//! signer. Opaque scheme messages travel base64-encoded; the gateway never
//! parses them. Authentication guards sit in front of this router.

mod dto;
mod error;
mod handlers;

pub use error::AppError;

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tower::{BoxError, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use warden_coordinator::SigningCoordinator;

/// Per-request deadline. Scheme rounds are CPU-bound and fast; chain RPC
/// carries its own timeouts below this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Peer messages are a few kilobytes; anything near this is abuse.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub(crate) struct GatewayState {
    pub(crate) coordinator: Arc<SigningCoordinator>,
}

/// Builds the signing router around a coordinator.
pub fn router(coordinator: Arc<SigningCoordinator>) -> Router {
    let state = GatewayState { coordinator };

    Router::new()
        .route(
            "/signers/:id/sign/session",
            post(handlers::create_tx_session),
        )
        .route("/signers/:id/sign/round", post(handlers::process_round))
        .route("/signers/:id/sign/complete", post(handlers::complete_sign))
        .route(
            "/signers/:id/sign-message/session",
            post(handlers::create_message_session),
        )
        .route(
            "/signers/:id/sign-message/round",
            post(handlers::process_round),
        )
        .route(
            "/signers/:id/sign-message/complete",
            post(handlers::complete_message_sign),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(map_middleware_error))
                .timeout(REQUEST_TIMEOUT),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// Small helper used by HandleErrorLayer to produce structured responses.
async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            axum::Json(serde_json::json!({
                "code": "REQUEST_TIMEOUT",
                "message": "request timed out",
            })),
        )
    } else {
        tracing::error!(target: "gateway", error = %err, "middleware failure");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({
                "code": "INTERNAL_ERROR",
                "message": "Internal server error",
            })),
        )
    }
}
