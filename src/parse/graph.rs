//! petgraph-based directed graph wrapper for the journey workflow.
//!
//! Edges come in two flavors: `Link` edges follow a link's `target`, and
//! `Body` edges descend from a loop/block into its body entry. Body
//! membership sets are precomputed so validators can ask "is this node
//! inside a loop/block" without re-walking.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use super::types::Workflow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    Link { name: Option<String> },
    Body,
}

pub struct JourneyGraph {
    pub graph: DiGraph<String, EdgeKind>,
    pub node_indices: HashMap<String, NodeIndex>,
    /// Container node id → ids of every node transitively inside its body.
    pub body_nodes: BTreeMap<String, BTreeSet<String>>,
}

impl JourneyGraph {
    /// Build never fails: dangling targets and missing bodies simply get no
    /// edge, and the structural validator reports them.
    pub fn build(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for key in workflow.nodes.keys() {
            let idx = graph.add_node(key.clone());
            node_indices.insert(key.clone(), idx);
        }

        for (key, node) in &workflow.nodes {
            let from = node_indices[key];
            for link in node.links() {
                if let Some(target) = &link.target
                    && let Some(&to) = node_indices.get(target)
                {
                    graph.add_edge(from, to, EdgeKind::Link { name: link.name.clone() });
                }
            }
            if let Some((_, body)) = node.body()
                && let Some(body_id) = body.id()
                && let Some(&to) = node_indices.get(body_id)
            {
                graph.add_edge(from, to, EdgeKind::Body);
            }
        }

        let mut body_nodes = BTreeMap::new();
        for (key, node) in &workflow.nodes {
            if !node.is_container() {
                continue;
            }
            let Some(entry) = node.body().and_then(|(_, b)| b.id()) else {
                continue;
            };
            let mut members = BTreeSet::new();
            let mut stack = vec![entry.to_string()];
            while let Some(current) = stack.pop() {
                if !workflow.nodes.contains_key(&current) || !members.insert(current.clone()) {
                    continue;
                }
                let member = &workflow.nodes[&current];
                for link in member.links() {
                    if let Some(target) = &link.target {
                        stack.push(target.clone());
                    }
                }
                // Nested containers pull their own body in as well.
                if let Some(nested) = member.body().and_then(|(_, b)| b.id()) {
                    stack.push(nested.to_string());
                }
            }
            members.remove(key);
            body_nodes.insert(key.clone(), members);
        }

        JourneyGraph {
            graph,
            node_indices,
            body_nodes,
        }
    }

    /// All node ids reachable from `head`, descending into bodies.
    pub fn reachable_from(&self, head: &str) -> HashSet<String> {
        let mut reachable = HashSet::new();
        let Some(&start) = self.node_indices.get(head) else {
            return reachable;
        };
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            reachable.insert(self.graph[idx].clone());
        }
        reachable
    }

    pub fn is_in_body(&self, node_id: &str) -> bool {
        self.body_nodes.values().any(|set| set.contains(node_id))
    }

    /// The innermost loop/block whose body contains `node_id`.
    pub fn innermost_container(&self, node_id: &str) -> Option<&str> {
        self.body_nodes
            .iter()
            .filter(|(_, set)| set.contains(node_id))
            .min_by_key(|(_, set)| set.len())
            .map(|(id, _)| id.as_str())
    }

    pub fn successors(&self, node_id: &str) -> Vec<(&str, &EdgeKind)> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .filter_map(|n| {
                let edge_idx = self.graph.find_edge(idx, n)?;
                Some((self.graph[n].as_str(), &self.graph[edge_idx]))
            })
            .collect()
    }
}
