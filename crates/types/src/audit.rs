// Path: crates/types/src/audit.rs
//! Append-only audit log entries.

use crate::policy::PolicyViolation;
use crate::session::SigningPath;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// What kind of signing request an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Interactive transaction signing.
    SignTx,
    /// Interactive message signing (no broadcast).
    SignMessage,
}

/// Terminal status of a signing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// The request completed and (for transactions) was broadcast.
    Approved,
    /// Policy evaluation denied the request.
    Blocked,
    /// The request failed after passing the policy gate.
    Failed,
}

/// One append-only audit record. Written BLOCKED at the policy gate,
/// APPROVED at completion, FAILED on any post-gate error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The signer the request was scoped to.
    pub signer_id: String,
    /// The owner's wallet address, denormalized at session creation.
    pub owner_address: Address,
    /// Transaction or message signing.
    pub request_type: RequestType,
    /// Terminal status.
    pub status: AuditStatus,
    /// Which two shares cooperated.
    pub signing_path: SigningPath,
    /// Transaction recipient, when applicable.
    pub to_address: Option<Address>,
    /// Transaction value in wei (zero for messages).
    pub value_wei: U256,
    /// EIP-155 chain id (zero for messages).
    pub chain_id: u64,
    /// Broadcast transaction hash, for APPROVED transaction entries.
    pub tx_hash: Option<B256>,
    /// Decoded function name, when the calldata selector was known.
    pub function_name: Option<String>,
    /// Number of policies/rules evaluated at the gate.
    pub policies_evaluated: u32,
    /// Policy evaluation wall-clock time.
    pub evaluation_time_ms: u64,
    /// Structured violations, for BLOCKED entries.
    pub violations: Vec<PolicyViolation>,
    /// Redacted error description, for FAILED entries.
    pub error: Option<String>,
    /// Caller IP, when the transport reported one.
    pub caller_ip: Option<String>,
    /// Unix timestamp in milliseconds.
    pub created_at_ms: u64,
}

impl AuditEntry {
    /// Current wall-clock time as unix milliseconds.
    pub fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Time windows the audit repository can aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditWindow {
    /// The last hour.
    LastHour,
    /// The last 24 hours.
    LastDay,
    /// The last 30 days.
    LastMonth,
}

impl AuditWindow {
    /// Window length in milliseconds.
    pub fn as_millis(&self) -> u64 {
        match self {
            AuditWindow::LastHour => 60 * 60 * 1000,
            AuditWindow::LastDay => 24 * 60 * 60 * 1000,
            AuditWindow::LastMonth => 30 * 24 * 60 * 60 * 1000,
        }
    }
}
