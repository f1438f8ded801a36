// Path: crates/types/src/policy.rs
//! Policy documents and evaluation context for the signing gate.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Everything the rules evaluator may look at for one signing request.
///
/// Rolling sums and counters come from the audit log; the wall clock is
/// sampled once at evaluation time. Message-signing contexts use
/// `value_wei = 0`, `chain_id = 0` and leave the roll-ups at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    /// The signer's Ethereum address.
    pub signer_address: Address,
    /// Transaction recipient, when a transaction is being signed.
    pub to_address: Option<Address>,
    /// Transaction value in wei.
    pub value_wei: U256,
    /// First four bytes of the calldata, when present.
    pub function_selector: Option<[u8; 4]>,
    /// EIP-155 chain id (0 for message signing).
    pub chain_id: u64,
    /// Sum of approved transaction values over the last 24 hours.
    pub rolling_daily_spend_wei: U256,
    /// Sum of approved transaction values over the last 30 days.
    pub rolling_monthly_spend_wei: U256,
    /// Approved/blocked request count over the last hour.
    pub request_count_last_hour: u64,
    /// Approved/blocked request count over the last 24 hours.
    pub request_count_today: u64,
    /// Current UTC hour, 0..=23.
    pub current_hour_utc: u8,
    /// Unix timestamp (milliseconds) of the evaluation.
    pub timestamp_ms: u64,
    /// Raw calldata, for rules that inspect it.
    pub tx_data: Option<Bytes>,
    /// Caller IP as reported by the transport, when known.
    pub caller_ip: Option<String>,
}

/// One structured reason a request was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Stable violation discriminator (e.g. `"MAX_VALUE_EXCEEDED"`).
    #[serde(rename = "type")]
    pub violation_type: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl PolicyViolation {
    /// Builds a violation from a discriminator and reason.
    pub fn new(violation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            violation_type: violation_type.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of evaluating a rules document or legacy policy list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Structured violations when denied; empty when allowed.
    pub violations: Vec<PolicyViolation>,
    /// Number of rules or policies that were evaluated.
    pub evaluated_count: u32,
    /// Wall-clock evaluation time.
    pub evaluation_time_ms: u64,
}

/// The default behavior when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Allow unless a rule denies.
    AllowAll,
    /// Deny unless a rule allows.
    DenyAll,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        // Fail closed: an empty or partial document must not open the wallet.
        Self::DenyAll
    }
}

/// The verdict a rule produces when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    /// Allow the request.
    Allow,
    /// Deny the request.
    Deny,
}

/// Conditions that refine when a rule applies. All present conditions must
/// hold for the rule to match; a rule with no conditions always matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Recipient allowlist.
    pub allow_recipients: Option<Vec<Address>>,
    /// Maximum value per transaction, in wei.
    pub max_value_wei: Option<U256>,
    /// Rolling 24-hour spend cap, in wei (evaluated against the roll-up
    /// plus the requested value).
    pub max_daily_spend_wei: Option<U256>,
    /// Rolling 30-day spend cap, in wei.
    pub max_monthly_spend_wei: Option<U256>,
    /// Request-rate cap over the last hour.
    pub max_requests_per_hour: Option<u64>,
    /// Request-rate cap over the last 24 hours.
    pub max_requests_per_day: Option<u64>,
    /// UTC hours (0..=23) during which signing is permitted.
    pub allowed_hours_utc: Option<Vec<u8>>,
    /// Chain-id allowlist.
    pub allowed_chain_ids: Option<Vec<u64>>,
    /// Function-selector allowlist, hex encoded (e.g. `"a9059cbb"`).
    pub allow_function_selectors: Option<Vec<String>>,
}

/// A single firewall rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Optional stable identifier, echoed into violations.
    pub rule_id: Option<String>,
    /// Conditions under which this rule applies.
    #[serde(default)]
    pub conditions: RuleConditions,
    /// The verdict when the rule matches.
    pub action: RuleAction,
}

/// A versioned rules document attached to a signer. First matching rule
/// wins; `defaults` applies when nothing matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesDocument {
    /// Unique identifier for this policy set.
    pub policy_id: String,
    /// The default behavior if no specific rule matches.
    #[serde(default)]
    pub defaults: DefaultPolicy,
    /// The list of rules, evaluated in order.
    pub rules: Vec<Rule>,
}

/// A legacy per-signer policy: a named bundle of conditions, all of which
/// must hold for the request to pass. Used only when a signer has no rules
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyPolicy {
    /// Policy name, echoed into violations.
    pub name: String,
    /// Conditions the request must satisfy.
    #[serde(default)]
    pub conditions: RuleConditions,
}
