// Path: crates/api/src/rules/mod.rs
//! The rules-engine contract.

use warden_types::policy::{LegacyPolicy, PolicyContext, PolicyDecision, RulesDocument};

/// What the policy gate hands to the evaluator: a rules document, or the
/// legacy policy list when the signer has no document.
#[derive(Debug, Clone)]
pub enum PolicySource {
    /// A versioned rules document (first match wins).
    Rules(RulesDocument),
    /// Legacy policies (all must pass; implicit deny on violation).
    Legacy(Vec<LegacyPolicy>),
}

/// Evaluates a policy source against a request context. Pure CPU work.
pub trait RulesEngine: Send + Sync {
    /// Produces the allow/deny decision with structured violations.
    fn evaluate(&self, source: &PolicySource, ctx: &PolicyContext) -> PolicyDecision;
}
