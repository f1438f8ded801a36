// Path: crates/scheme/src/bridge.rs
//! Driver for the out-of-process native-GMP signing helper.
//!
//! The helper speaks the same session protocol as the in-process engine
//! but is compiled against the GMP arithmetic backend, whose wire
//! serialization is not interoperable with num-bigint peers. It runs as a
//! child process; requests and responses are line-delimited JSON on its
//! stdio, correlated by id. Secret material crosses the boundary base64
//! encoded and is the helper's to wipe.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use warden_api::scheme::{
    CreateSignSession, CreatedSession, RawSignature, RoundOutput, SchemeBackend, SchemeEngine,
};
use warden_types::error::SchemeError;
use warden_types::peer::PeerMessage;

/// Per-call deadline. The helper does pure CPU work; anything slower than
/// this means it is wedged.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Scheme engine backed by the native helper binary.
pub struct GmpBridge {
    helper_path: PathBuf,
    io: Mutex<BridgeIo>,
}

impl GmpBridge {
    /// Spawns the helper and wires up its stdio.
    pub fn spawn(helper_path: &Path) -> Result<Self, SchemeError> {
        let mut child = Command::new(helper_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SchemeError::Bridge(format!("spawn {}: {e}", helper_path.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SchemeError::Bridge("helper stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SchemeError::Bridge("helper stdout unavailable".into()))?;

        Ok(Self {
            helper_path: helper_path.to_path_buf(),
            io: Mutex::new(BridgeIo {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: &str,
        params: serde_json::Value,
    ) -> Result<T, SchemeError> {
        let mut io = self.io.lock().await;

        io.next_id += 1;
        let id = io.next_id;
        let mut line = serde_json::to_vec(&Request { id, op, params })
            .map_err(|e| SchemeError::Bridge(format!("encode request: {e}")))?;
        line.push(b'\n');

        let exchange = async {
            io.stdin
                .write_all(&line)
                .await
                .map_err(|e| SchemeError::Bridge(format!("write to helper: {e}")))?;
            io.stdin
                .flush()
                .await
                .map_err(|e| SchemeError::Bridge(format!("flush to helper: {e}")))?;

            loop {
                let raw = io
                    .stdout
                    .next_line()
                    .await
                    .map_err(|e| SchemeError::Bridge(format!("read from helper: {e}")))?
                    .ok_or_else(|| SchemeError::Bridge("helper closed its stdout".into()))?;

                let response: Response = serde_json::from_str(&raw)
                    .map_err(|e| SchemeError::Bridge(format!("malformed helper response: {e}")))?;

                // Stdio is a strict request-response stream; a mismatched id
                // means a stale line from a timed-out call. Skip it.
                if response.id != id {
                    continue;
                }

                if let Some(message) = response.error {
                    return Err(SchemeError::Bridge(message));
                }
                let result = response
                    .result
                    .ok_or_else(|| SchemeError::Bridge("helper response had no result".into()))?;
                return serde_json::from_value(result)
                    .map_err(|e| SchemeError::Bridge(format!("decode helper result: {e}")));
            }
        };

        match tokio::time::timeout(CALL_TIMEOUT, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    helper = %self.helper_path.display(),
                    op,
                    "native signing helper timed out"
                );
                // A wedged helper cannot be trusted with further sessions.
                let _ = io.child.start_kill();
                Err(SchemeError::Bridge(format!("helper timed out on {op}")))
            }
        }
    }
}

#[derive(Deserialize)]
struct CreatedOverBridge {
    session_id: String,
    #[serde(default)]
    first_messages: Vec<PeerMessage>,
}

#[derive(Deserialize)]
struct RoundOverBridge {
    #[serde(default)]
    messages: Vec<PeerMessage>,
    complete: bool,
}

#[derive(Deserialize)]
struct SignatureOverBridge {
    r: String,
    s: String,
}

fn decode_scalar(b64: &str, name: &str) -> Result<[u8; 32], SchemeError> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| SchemeError::Bridge(format!("{name} base64: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| SchemeError::Bridge(format!("{name} is not 32 bytes")))
}

#[async_trait]
impl SchemeEngine for GmpBridge {
    fn backend(&self) -> SchemeBackend {
        SchemeBackend::Native
    }

    async fn create_sign_session(
        &self,
        params: CreateSignSession<'_>,
    ) -> Result<CreatedSession, SchemeError> {
        let created: CreatedOverBridge = self
            .call(
                "create_sign_session",
                json!({
                    "core_share": BASE64.encode(params.core_share),
                    "aux_info": BASE64.encode(params.aux_info),
                    "message_hash": BASE64.encode(params.message_hash),
                    "party_index": params.party_index,
                    "parties_at_keygen": params.parties_at_keygen,
                    "eid": BASE64.encode(params.eid),
                }),
            )
            .await?;

        Ok(CreatedSession {
            session_id: created.session_id,
            first_messages: created.first_messages,
        })
    }

    async fn process_sign_round(
        &self,
        session_id: &str,
        incoming: &[PeerMessage],
    ) -> Result<RoundOutput, SchemeError> {
        let round: RoundOverBridge = self
            .call(
                "process_sign_round",
                json!({ "session_id": session_id, "messages": incoming }),
            )
            .await?;

        Ok(RoundOutput {
            messages: round.messages,
            complete: round.complete,
        })
    }

    async fn finalize_sign(&self, session_id: &str) -> Result<RawSignature, SchemeError> {
        let sig: SignatureOverBridge = self
            .call("finalize_sign", json!({ "session_id": session_id }))
            .await?;

        Ok(RawSignature {
            r: decode_scalar(&sig.r, "r")?,
            s: decode_scalar(&sig.s, "s")?,
        })
    }

    fn extract_public_key(&self, core_share: &[u8]) -> Result<[u8; 33], SchemeError> {
        // Key-share JSON is backend-independent; no need to round-trip
        // through the helper for a read-only field.
        crate::engine::extract_public_key_bytes(core_share)
    }

    async fn destroy_session(&self, session_id: &str) {
        if let Err(e) = self
            .call::<serde_json::Value>("destroy_session", json!({ "session_id": session_id }))
            .await
        {
            tracing::warn!(session_id, error = %e, "failed to destroy helper session");
        }
    }
}
