// Path: crates/coordinator/src/gate.rs
//! The policy gate: context assembly and evaluation.
//!
//! For transactions the gate queries the audit log for rolling spend
//! (24h, 30d) and request counts (1h, 24h), samples the UTC hour, and
//! hands the assembled context to the rules engine. Message signing uses
//! a zeroed context and skips the roll-ups.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::U256;

use warden_api::repo::{AuditRepository, PolicyRepository};
use warden_api::rules::{PolicySource, RulesEngine};
use warden_types::audit::AuditWindow;
use warden_types::error::WardenError;
use warden_types::policy::{PolicyContext, PolicyDecision};
use warden_types::signer::Signer;
use warden_types::tx::{DecodedTransaction, PopulatedTransaction};

/// Builds contexts and asks the rules engine for allow/deny.
pub struct PolicyGate {
    audit: Arc<dyn AuditRepository>,
    policies: Arc<dyn PolicyRepository>,
    engine: Arc<dyn RulesEngine>,
}

impl PolicyGate {
    /// Wires the gate to its collaborators.
    pub fn new(
        audit: Arc<dyn AuditRepository>,
        policies: Arc<dyn PolicyRepository>,
        engine: Arc<dyn RulesEngine>,
    ) -> Self {
        Self {
            audit,
            policies,
            engine,
        }
    }

    /// Assembles the evaluation context for a transaction request.
    pub async fn build_tx_context(
        &self,
        signer: &Signer,
        tx: &PopulatedTransaction,
        decoded: &DecodedTransaction,
        caller_ip: Option<String>,
    ) -> Result<PolicyContext, WardenError> {
        let daily = self
            .audit
            .sum_value_by_signer_in_window(&signer.id, AuditWindow::LastDay)
            .await?;
        let monthly = self
            .audit
            .sum_value_by_signer_in_window(&signer.id, AuditWindow::LastMonth)
            .await?;
        let hourly_count = self
            .audit
            .count_by_signer_in_window(&signer.id, AuditWindow::LastHour)
            .await?;
        let daily_count = self
            .audit
            .count_by_signer_in_window(&signer.id, AuditWindow::LastDay)
            .await?;

        let (timestamp_ms, hour) = clock_now();

        Ok(PolicyContext {
            signer_address: signer.eth_address,
            to_address: decoded.to.or(Some(tx.to)),
            value_wei: tx.value,
            function_selector: decoded.function_selector,
            chain_id: tx.chain_id,
            rolling_daily_spend_wei: daily,
            rolling_monthly_spend_wei: monthly,
            request_count_last_hour: hourly_count,
            request_count_today: daily_count,
            current_hour_utc: hour,
            timestamp_ms,
            tx_data: Some(tx.data.clone()),
            caller_ip,
        })
    }

    /// Context for a message-signing request: no value, no chain, no
    /// spend roll-ups.
    pub fn build_message_context(
        &self,
        signer: &Signer,
        caller_ip: Option<String>,
    ) -> PolicyContext {
        let (timestamp_ms, hour) = clock_now();
        PolicyContext {
            signer_address: signer.eth_address,
            to_address: None,
            value_wei: U256::ZERO,
            function_selector: None,
            chain_id: 0,
            rolling_daily_spend_wei: U256::ZERO,
            rolling_monthly_spend_wei: U256::ZERO,
            request_count_last_hour: 0,
            request_count_today: 0,
            current_hour_utc: hour,
            timestamp_ms,
            tx_data: None,
            caller_ip,
        }
    }

    /// Evaluates the signer's rules document, falling back to the legacy
    /// per-policy list when no document exists.
    pub async fn evaluate(
        &self,
        signer_id: &str,
        ctx: &PolicyContext,
    ) -> Result<PolicyDecision, WardenError> {
        let source = match self.policies.find_rules(signer_id).await? {
            Some(doc) => PolicySource::Rules(doc),
            None => PolicySource::Legacy(self.policies.find_legacy_policies(signer_id).await?),
        };
        Ok(self.engine.evaluate(&source, ctx))
    }
}

fn clock_now() -> (u64, u8) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let hour = ((now_ms / 1000 / 3600) % 24) as u8;
    (now_ms, hour)
}
