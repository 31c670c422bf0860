//! Body-shadow repair. Every loop/block body entry must also exist as a
//! top-level node with identical content; on divergence the top-level
//! entry wins and the embedded copy is rewritten from it.

use super::AppliedFix;
use crate::parse::types::Workflow;

pub fn fix_bodies(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some((body_key, body)) = workflow.nodes.get(&key).and_then(|n| n.body()) else {
            continue;
        };
        let Some(body_id) = body.id().map(str::to_string) else {
            continue;
        };
        let body_clone = body.clone();

        match workflow.nodes.get(&body_id) {
            Some(entry) => {
                if entry.to_value() != body_clone.to_value() {
                    let entry_clone = entry.clone();
                    if let Some(container) = workflow.nodes.get_mut(&key)
                        && let Some(embedded) = container.body_mut()
                    {
                        *embedded = entry_clone;
                    }
                    fixes.push(AppliedFix::new(
                        "body",
                        format!("re-synced '{body_key}' copy of '{body_id}' from its top-level entry"),
                        Some(key),
                    ));
                }
            }
            None => {
                workflow.nodes.insert(body_id.clone(), body_clone);
                fixes.push(AppliedFix::new(
                    "body",
                    format!("added missing top-level entry for '{body_key}' node '{body_id}'"),
                    Some(key),
                ));
            }
        }
    }
}
