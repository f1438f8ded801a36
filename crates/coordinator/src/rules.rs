// Path: crates/coordinator/src/rules.rs
//! The rules evaluator behind the policy gate.
//!
//! A rules document is an ordered list: the first rule whose conditions all
//! hold decides the request (specific overrides general), and `defaults`
//! decides when nothing matches. Condition failures of `Allow` rules are
//! collected so a denial can explain itself. Legacy per-signer policies run
//! through the same condition checks with an implicit deny-on-violation.

use std::time::Instant;

use warden_api::rules::{PolicySource, RulesEngine};
use warden_types::policy::{
    DefaultPolicy, LegacyPolicy, PolicyContext, PolicyDecision, PolicyViolation, Rule, RuleAction,
    RuleConditions, RulesDocument,
};

/// Stateless rules evaluator.
#[derive(Default)]
pub struct RulesEvaluator;

impl RulesEvaluator {
    /// Builds the evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl RulesEngine for RulesEvaluator {
    fn evaluate(&self, source: &PolicySource, ctx: &PolicyContext) -> PolicyDecision {
        let start = Instant::now();
        let (allowed, violations, evaluated_count) = match source {
            PolicySource::Rules(doc) => evaluate_rules(doc, ctx),
            PolicySource::Legacy(policies) => evaluate_legacy(policies, ctx),
        };

        PolicyDecision {
            allowed,
            violations,
            evaluated_count,
            evaluation_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

fn evaluate_rules(doc: &RulesDocument, ctx: &PolicyContext) -> (bool, Vec<PolicyViolation>, u32) {
    let mut collected = Vec::new();
    let mut evaluated = 0u32;

    for rule in &doc.rules {
        evaluated += 1;
        let failures = check_conditions(&rule.conditions, ctx);

        match rule.action {
            RuleAction::Allow => {
                if failures.is_empty() {
                    return (true, Vec::new(), evaluated);
                }
                // Remember why this allow did not apply, then keep scanning.
                collected.extend(failures);
            }
            RuleAction::Deny => {
                if failures.is_empty() {
                    collected.push(deny_violation(rule));
                    return (false, collected, evaluated);
                }
            }
        }
    }

    match doc.defaults {
        DefaultPolicy::AllowAll => (true, Vec::new(), evaluated),
        DefaultPolicy::DenyAll => {
            if collected.is_empty() {
                collected.push(PolicyViolation::new(
                    "DEFAULT_DENY",
                    format!("no rule in '{}' allows this request", doc.policy_id),
                ));
            }
            (false, collected, evaluated)
        }
    }
}

fn evaluate_legacy(
    policies: &[LegacyPolicy],
    ctx: &PolicyContext,
) -> (bool, Vec<PolicyViolation>, u32) {
    let mut violations = Vec::new();
    for policy in policies {
        violations.extend(check_conditions(&policy.conditions, ctx));
    }
    (violations.is_empty(), violations, policies.len() as u32)
}

fn deny_violation(rule: &Rule) -> PolicyViolation {
    let id = rule.rule_id.as_deref().unwrap_or("unnamed");
    PolicyViolation::new("DENY_RULE_MATCHED", format!("deny rule '{id}' matched"))
}

/// Returns one violation per failed condition; empty means the rule
/// matches the context.
fn check_conditions(conditions: &RuleConditions, ctx: &PolicyContext) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    if let Some(recipients) = &conditions.allow_recipients {
        match ctx.to_address {
            Some(to) if recipients.contains(&to) => {}
            Some(to) => violations.push(PolicyViolation::new(
                "RECIPIENT_NOT_ALLOWED",
                format!("recipient {to} is not on the allowlist"),
            )),
            None => violations.push(PolicyViolation::new(
                "RECIPIENT_NOT_ALLOWED",
                "request has no recipient to check against the allowlist",
            )),
        }
    }

    if let Some(max) = conditions.max_value_wei {
        if ctx.value_wei > max {
            violations.push(PolicyViolation::new(
                "MAX_VALUE_EXCEEDED",
                format!("value {} wei exceeds the {} wei cap", ctx.value_wei, max),
            ));
        }
    }

    if let Some(cap) = conditions.max_daily_spend_wei {
        let projected = ctx.rolling_daily_spend_wei.saturating_add(ctx.value_wei);
        if projected > cap {
            violations.push(PolicyViolation::new(
                "DAILY_SPEND_EXCEEDED",
                format!("24h spend would reach {projected} wei, cap is {cap} wei"),
            ));
        }
    }

    if let Some(cap) = conditions.max_monthly_spend_wei {
        let projected = ctx.rolling_monthly_spend_wei.saturating_add(ctx.value_wei);
        if projected > cap {
            violations.push(PolicyViolation::new(
                "MONTHLY_SPEND_EXCEEDED",
                format!("30d spend would reach {projected} wei, cap is {cap} wei"),
            ));
        }
    }

    if let Some(cap) = conditions.max_requests_per_hour {
        if ctx.request_count_last_hour >= cap {
            violations.push(PolicyViolation::new(
                "HOURLY_RATE_EXCEEDED",
                format!(
                    "{} requests in the last hour, cap is {cap}",
                    ctx.request_count_last_hour
                ),
            ));
        }
    }

    if let Some(cap) = conditions.max_requests_per_day {
        if ctx.request_count_today >= cap {
            violations.push(PolicyViolation::new(
                "DAILY_RATE_EXCEEDED",
                format!(
                    "{} requests in the last 24h, cap is {cap}",
                    ctx.request_count_today
                ),
            ));
        }
    }

    if let Some(hours) = &conditions.allowed_hours_utc {
        if !hours.contains(&ctx.current_hour_utc) {
            violations.push(PolicyViolation::new(
                "HOUR_NOT_ALLOWED",
                format!("signing at {:02}:00 UTC is outside the allowed hours", ctx.current_hour_utc),
            ));
        }
    }

    if let Some(chains) = &conditions.allowed_chain_ids {
        if !chains.contains(&ctx.chain_id) {
            violations.push(PolicyViolation::new(
                "CHAIN_NOT_ALLOWED",
                format!("chain {} is not on the allowlist", ctx.chain_id),
            ));
        }
    }

    if let Some(selectors) = &conditions.allow_function_selectors {
        let found = ctx.function_selector.map(hex::encode);
        match found {
            Some(sel) if selectors.iter().any(|s| s.eq_ignore_ascii_case(&sel)) => {}
            Some(sel) => violations.push(PolicyViolation::new(
                "FUNCTION_NOT_ALLOWED",
                format!("selector 0x{sel} is not on the allowlist"),
            )),
            // Plain transfers carry no selector; treat as allowed.
            None => {}
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    fn ctx() -> PolicyContext {
        PolicyContext {
            signer_address: Address::repeat_byte(0x11),
            to_address: Some(Address::repeat_byte(0x22)),
            value_wei: U256::from(2u64),
            function_selector: None,
            chain_id: 11155111,
            rolling_daily_spend_wei: U256::ZERO,
            rolling_monthly_spend_wei: U256::ZERO,
            request_count_last_hour: 0,
            request_count_today: 0,
            current_hour_utc: 12,
            timestamp_ms: 0,
            tx_data: None,
            caller_ip: None,
        }
    }

    fn allow_rule(conditions: RuleConditions) -> Rule {
        Rule {
            rule_id: Some("r1".into()),
            conditions,
            action: RuleAction::Allow,
        }
    }

    #[test]
    fn value_over_cap_is_denied_with_a_named_violation() {
        let doc = RulesDocument {
            policy_id: "caps".into(),
            defaults: DefaultPolicy::DenyAll,
            rules: vec![allow_rule(RuleConditions {
                max_value_wei: Some(U256::from(1u64)),
                ..Default::default()
            })],
        };

        let decision = RulesEvaluator::new().evaluate(&PolicySource::Rules(doc), &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.evaluated_count, 1);
        assert!(decision
            .violations
            .iter()
            .any(|v| v.violation_type == "MAX_VALUE_EXCEEDED"));
    }

    #[test]
    fn first_matching_allow_wins() {
        let doc = RulesDocument {
            policy_id: "p".into(),
            defaults: DefaultPolicy::DenyAll,
            rules: vec![
                allow_rule(RuleConditions {
                    max_value_wei: Some(U256::from(100u64)),
                    ..Default::default()
                }),
                Rule {
                    rule_id: Some("deny-everything".into()),
                    conditions: RuleConditions::default(),
                    action: RuleAction::Deny,
                },
            ],
        };

        let decision = RulesEvaluator::new().evaluate(&PolicySource::Rules(doc), &ctx());
        assert!(decision.allowed);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn unconditional_deny_rule_blocks() {
        let doc = RulesDocument {
            policy_id: "p".into(),
            defaults: DefaultPolicy::AllowAll,
            rules: vec![Rule {
                rule_id: Some("freeze".into()),
                conditions: RuleConditions::default(),
                action: RuleAction::Deny,
            }],
        };

        let decision = RulesEvaluator::new().evaluate(&PolicySource::Rules(doc), &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.violations[0].violation_type, "DENY_RULE_MATCHED");
    }

    #[test]
    fn rate_and_spend_rollups_count_the_pending_request() {
        let mut context = ctx();
        context.rolling_daily_spend_wei = U256::from(99u64);
        context.value_wei = U256::from(2u64);
        context.request_count_last_hour = 10;

        let failures = check_conditions(
            &RuleConditions {
                max_daily_spend_wei: Some(U256::from(100u64)),
                max_requests_per_hour: Some(10),
                ..Default::default()
            },
            &context,
        );
        let types: Vec<_> = failures.iter().map(|v| v.violation_type.as_str()).collect();
        assert!(types.contains(&"DAILY_SPEND_EXCEEDED"));
        assert!(types.contains(&"HOURLY_RATE_EXCEEDED"));
    }

    #[test]
    fn legacy_policies_all_must_pass() {
        let policies = vec![
            LegacyPolicy {
                name: "value-cap".into(),
                conditions: RuleConditions {
                    max_value_wei: Some(U256::from(1u64)),
                    ..Default::default()
                },
            },
            LegacyPolicy {
                name: "chain-pin".into(),
                conditions: RuleConditions {
                    allowed_chain_ids: Some(vec![11155111]),
                    ..Default::default()
                },
            },
        ];

        let decision = RulesEvaluator::new().evaluate(&PolicySource::Legacy(policies), &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.evaluated_count, 2);
        // Only the value cap fails; the chain pin passes.
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].violation_type, "MAX_VALUE_EXCEEDED");
    }

    #[test]
    fn empty_legacy_list_allows() {
        let decision = RulesEvaluator::new().evaluate(&PolicySource::Legacy(Vec::new()), &ctx());
        assert!(decision.allowed);
        assert_eq!(decision.evaluated_count, 0);
    }

    #[test]
    fn empty_document_fails_closed() {
        let doc = RulesDocument {
            policy_id: "empty".into(),
            defaults: DefaultPolicy::DenyAll,
            rules: Vec::new(),
        };
        let decision = RulesEvaluator::new().evaluate(&PolicySource::Rules(doc), &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.violations[0].violation_type, "DEFAULT_DENY");
    }
}
