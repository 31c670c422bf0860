//! Auto-fix engine.
//!
//! `fix_source` repairs over-escaped JSON text before parsing;
//! `fix_journey` runs the in-memory rewrite pipeline. Both are idempotent
//! over the document: a second application produces no further changes.
//! Fixes never fail on fixable defects; the only fatal condition is input
//! that cannot be parsed at all.

pub mod body;
pub mod escaping;
pub mod expressions;
pub mod metadata;
pub mod nodes;
pub mod uuids;
pub mod variables;

pub use escaping::fix_source;

use serde::Serialize;

use crate::parse::types::Journey;
use crate::registry::Registry;

/// One applied repair. The caller owns presentation; the engine only logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFix {
    pub rule: String,
    pub message: String,
    pub node_id: Option<String>,
}

impl AppliedFix {
    pub(crate) fn new(rule: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        AppliedFix {
            rule: rule.into(),
            message: message.into(),
            node_id,
        }
    }
}

impl std::fmt::Display for AppliedFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "[fix:{}] {} (node '{}')", self.rule, self.message, id),
            None => write!(f, "[fix:{}] {}", self.rule, self.message),
        }
    }
}

/// Run the full repair pipeline in order. Returns the log of applied fixes.
pub fn fix_journey(journey: &mut Journey, registry: &Registry) -> Vec<AppliedFix> {
    let mut fixes = Vec::new();

    metadata::fix_journey_type(journey, registry, &mut fixes);
    metadata::fix_envelope(journey, registry, &mut fixes);

    if let Some(workflow) = journey.workflow_mut() {
        uuids::fix_workflow_uuids(workflow, &mut fixes);
        body::fix_bodies(workflow, &mut fixes);
        expressions::fix_condition_backticks(workflow, &mut fixes);
        expressions::fix_set_variables_backticks(workflow, &mut fixes);
        nodes::fix_link_types(workflow, registry, &mut fixes);
        nodes::fix_terminal_metadata(workflow, &mut fixes);
        nodes::fix_get_information_actions(workflow, &mut fixes);
        expressions::fix_strict_equality(workflow, &mut fixes);
        expressions::fix_information_nodes(workflow, &mut fixes);
        nodes::fix_form_boilerplate(workflow, &mut fixes);
        // Later passes edit top-level entries; bring the shadows back in sync.
        body::fix_bodies(workflow, &mut fixes);
    }

    fixes
}
