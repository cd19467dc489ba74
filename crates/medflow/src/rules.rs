//! Cross-domain invalidation rules.

use medflow_cache::{InvalidationRule, Tag};
use medflow_config::RuleConfig;
use tracing::debug;

use crate::domains::{ANESTHESIOLOGIST, DOCTOR, NURSE, actions, kinds};
use crate::error::Result;

/// The built-in rule table.
///
/// | source | action | target | tag |
/// |---|---|---|---|
/// | doctor | approve / reject recommendation | nurse, anesthesiologist | `Recommendation` |
/// | nurse, anesthesiologist | create recommendation | doctor | `Recommendation` |
/// | nurse | submit VAS score | doctor, anesthesiologist | `VasScore` |
///
/// Admin writes only touch the admin domain.
pub fn default_rules() -> Vec<InvalidationRule> {
    let recommendation = || Tag::kind(kinds::RECOMMENDATION);
    let vas = || Tag::kind(kinds::VAS_SCORE);

    let mut rules = Vec::new();
    for action in [
        actions::APPROVE_RECOMMENDATION,
        actions::REJECT_RECOMMENDATION,
    ] {
        for target in [NURSE, ANESTHESIOLOGIST] {
            rules.push(InvalidationRule::new(DOCTOR, action, target, recommendation()));
        }
    }
    for source in [NURSE, ANESTHESIOLOGIST] {
        rules.push(InvalidationRule::new(
            source,
            actions::CREATE_RECOMMENDATION,
            DOCTOR,
            recommendation(),
        ));
    }
    for target in [DOCTOR, ANESTHESIOLOGIST] {
        rules.push(InvalidationRule::new(
            NURSE,
            actions::SUBMIT_VAS_SCORE,
            target,
            vas(),
        ));
    }
    rules
}

/// Convert configured rules.
pub fn from_config(configured: &[RuleConfig]) -> Result<Vec<InvalidationRule>> {
    configured
        .iter()
        .map(|rule| {
            let parsed = InvalidationRule::parse(
                rule.source_domain.as_str(),
                rule.source_action.as_str(),
                rule.target_domain.as_str(),
                &rule.target_tag,
            )?;
            debug!(
                source = %parsed.source_domain,
                action = %parsed.source_action,
                target = %parsed.target_domain,
                tag = %parsed.target_tag,
                "Loaded configured invalidation rule"
            );
            Ok(parsed)
        })
        .collect()
}
