//! Tag synthesis.

use preserve_core::config::non_blank;
use preserve_core::{DeploymentContext, TagSet};

use crate::location::deployment_id;

/// Value used for every context field that is absent.
pub const UNKNOWN: &str = "unknown";

/// Tags for a fresh object, in a fixed key order.
pub fn synthesize_tags(context: &DeploymentContext, plan_identifier: Option<&str>) -> TagSet {
    let value = |v: &Option<String>| non_blank(v.as_deref()).unwrap_or(UNKNOWN).to_string();
    let deployment = non_blank(plan_identifier)
        .and_then(deployment_id)
        .unwrap_or_else(|| UNKNOWN.to_string());
    TagSet::from_pairs([
        ("commit_id", value(&context.commit_id)),
        ("environment", value(&context.environment)),
        ("business_unit", value(&context.business_unit)),
        ("product", value(&context.product)),
        ("owner", value(&context.owner)),
        ("deployment_id", deployment),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_context_is_all_unknown() {
        let tags = synthesize_tags(&DeploymentContext::default(), None);
        assert_eq!(tags.pairs().len(), 6);
        assert!(tags.pairs().iter().all(|(_, v)| v == UNKNOWN));
    }

    #[test]
    fn context_and_plan_fill_values() {
        let ctx = DeploymentContext {
            commit_id: Some("abc123".into()),
            environment: Some("prod".into()),
            owner: Some("  ".into()),
            ..DeploymentContext::default()
        };
        let tags = synthesize_tags(&ctx, Some("s3://plans/app/run-9.plan"));
        assert_eq!(tags.get("commit_id"), Some("abc123"));
        assert_eq!(tags.get("environment"), Some("prod"));
        assert_eq!(tags.get("owner"), Some(UNKNOWN));
        assert_eq!(tags.get("deployment_id"), Some("run-9"));
        assert_eq!(
            tags.to_query_string(),
            "commit_id=abc123&environment=prod&business_unit=unknown&product=unknown&owner=unknown&deployment_id=run-9"
        );
    }
}
