//! Read-only validation phase.
//!
//! Every validator runs to completion and accumulates diagnostics; nothing
//! here mutates the document or stops at the first finding.

pub mod expressions;
pub mod metadata;
pub mod required_fields;
pub mod structural;
pub mod variables;

use crate::error::Diagnostic;
use crate::parse::graph::JourneyGraph;
use crate::parse::types::Journey;
use crate::registry::Registry;

/// Run the full validator suite over one journey document.
pub fn validate_journey(journey: &Journey, registry: &Registry) -> Vec<Diagnostic> {
    let mut diags = metadata::validate_metadata(journey, registry);

    let Some(workflow) = journey.workflow() else {
        // Already reported as M006; nothing else to check.
        return diags;
    };

    let graph = JourneyGraph::build(workflow);
    diags.extend(structural::validate_structural(workflow, &graph, registry));
    diags.extend(expressions::validate_expressions(workflow, registry));
    diags.extend(variables::validate_variables(workflow, &graph, registry));
    diags.extend(required_fields::validate_required_fields(workflow, registry));
    diags
}
