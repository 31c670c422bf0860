//! Serde target for journey documents.
//!
//! The model is deliberately permissive: envelope and node fields that the
//! platform requires are `Option` here, so a missing field surfaces as a
//! diagnostic instead of a parse failure, and every struct carries a
//! flattened extras map so repaired documents round-trip byte-for-byte at
//! the value level. The one hard requirement is that the input parses as
//! the expected JSON shape at all.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Extra = Map<String, Value>;

// =============================================================================
// EXPORT ENVELOPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<Export>>,
    /// Bare-workflow form: a document that is just a workflow, no envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExportData>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub journey_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<Version>>,
    /// Milliseconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_criteria: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<Value>,
    /// Seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Journey {
    /// The workflow under validation: the bare workflow if present,
    /// otherwise the first version of the first export.
    pub fn workflow(&self) -> Option<&Workflow> {
        if let Some(wf) = &self.workflow {
            return Some(wf);
        }
        self.exports
            .as_ref()?
            .first()?
            .data
            .as_ref()?
            .versions
            .as_ref()?
            .first()?
            .workflow
            .as_ref()
    }

    pub fn workflow_mut(&mut self) -> Option<&mut Workflow> {
        if self.workflow.is_some() {
            return self.workflow.as_mut();
        }
        self.exports
            .as_mut()?
            .first_mut()?
            .data
            .as_mut()?
            .versions
            .as_mut()?
            .first_mut()?
            .workflow
            .as_mut()
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(flatten)]
    pub extra: Extra,
}

// =============================================================================
// NODE — tagged union over the `type` key
// =============================================================================

/// Closed union over the four structural node kinds, with a fallback for
/// platform-integration types. The tag string stays on each variant so
/// serialization is plain `#[serde(untagged)]`; deserialization dispatches
/// on the `type` key by hand, which keeps the tag out of the extras maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Action(ActionNode),
    Condition(ConditionNode),
    Loop(LoopNode),
    Block(BlockNode),
    Platform(PlatformNode),
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let tag = value.get("type").and_then(Value::as_str).unwrap_or("");
        let node = match tag {
            "action" => Node::Action(serde_json::from_value(value).map_err(D::Error::custom)?),
            "condition" => {
                Node::Condition(serde_json::from_value(value).map_err(D::Error::custom)?)
            }
            "loop" => Node::Loop(serde_json::from_value(value).map_err(D::Error::custom)?),
            "block" => Node::Block(serde_json::from_value(value).map_err(D::Error::custom)?),
            _ => Node::Platform(serde_json::from_value(value).map_err(D::Error::custom)?),
        };
        Ok(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_var: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionBody>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBody {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<VariableInit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_text: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var_name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ActionBody {
    /// `metadata.type`, when metadata is an object carrying one.
    pub fn metadata_type(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("type")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_body: Option<Box<Node>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<VariableInit>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<Node>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_var: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_variable: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Node {
    pub fn id(&self) -> Option<&str> {
        match self {
            Node::Action(n) => n.id.as_deref(),
            Node::Condition(n) => n.id.as_deref(),
            Node::Loop(n) => n.id.as_deref(),
            Node::Block(n) => n.id.as_deref(),
            Node::Platform(n) => n.id.as_deref(),
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            Node::Action(n) => n.id = Some(id),
            Node::Condition(n) => n.id = Some(id),
            Node::Loop(n) => n.id = Some(id),
            Node::Block(n) => n.id = Some(id),
            Node::Platform(n) => n.id = Some(id),
        }
    }

    /// The raw `type` tag. `None` only for a platform node missing it.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            Node::Action(_) => Some("action"),
            Node::Condition(_) => Some("condition"),
            Node::Loop(_) => Some("loop"),
            Node::Block(_) => Some("block"),
            Node::Platform(n) => n.node_type.as_deref(),
        }
    }

    pub fn links(&self) -> &[Link] {
        let links = match self {
            Node::Action(n) => &n.links,
            Node::Condition(n) => &n.links,
            Node::Loop(n) => &n.links,
            Node::Block(n) => &n.links,
            Node::Platform(n) => &n.links,
        };
        links.as_deref().unwrap_or(&[])
    }

    pub fn links_mut(&mut self) -> Option<&mut Vec<Link>> {
        match self {
            Node::Action(n) => n.links.as_mut(),
            Node::Condition(n) => n.links.as_mut(),
            Node::Loop(n) => n.links.as_mut(),
            Node::Block(n) => n.links.as_mut(),
            Node::Platform(n) => n.links.as_mut(),
        }
    }

    pub fn action(&self) -> Option<&ActionBody> {
        match self {
            Node::Action(n) => n.action.as_ref(),
            _ => None,
        }
    }

    pub fn action_mut(&mut self) -> Option<&mut ActionBody> {
        match self {
            Node::Action(n) => n.action.as_mut(),
            _ => None,
        }
    }

    /// Embedded body of a loop or block, with the key it lives under.
    pub fn body(&self) -> Option<(&'static str, &Node)> {
        match self {
            Node::Loop(n) => n.loop_body.as_deref().map(|b| ("loop_body", b)),
            Node::Block(n) => n.block.as_deref().map(|b| ("block", b)),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Node> {
        match self {
            Node::Loop(n) => n.loop_body.as_deref_mut(),
            Node::Block(n) => n.block.as_deref_mut(),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Loop(_) | Node::Block(_))
    }

    /// Registry lookup key. For action nodes this is `action.type`, except
    /// that a `form` action resolves through `action.metadata.type` so
    /// `get_information` and `login_form` forms get their own contracts.
    pub fn registry_kind(&self) -> Option<&str> {
        match self {
            Node::Action(n) => {
                let action = n.action.as_ref()?;
                let action_type = action.action_type.as_deref()?;
                if action_type == "form" {
                    Some(action.metadata_type().unwrap_or("form"))
                } else {
                    Some(action_type)
                }
            }
            other => other.type_tag(),
        }
    }

    /// Action-kind for field contracts: `action.type` without the form
    /// metadata resolution.
    pub fn field_kind(&self) -> Option<&str> {
        match self {
            Node::Action(n) => n.action.as_ref()?.action_type.as_deref(),
            other => other.type_tag(),
        }
    }

    pub fn output_var(&self) -> Option<&str> {
        match self {
            Node::Action(n) => n.output_var.as_deref(),
            Node::Platform(n) => n.output_var.as_deref(),
            _ => None,
        }
    }

    /// JSON value of the whole node, for generic scans and equality checks.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// =============================================================================
// LINKS & EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    /// Absent inside a loop/block body means "retry": resume the enclosing
    /// loop's evaluation. Anywhere else an absent target is a defect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_json_schema: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(rename = "type")]
    pub expr_type: String,
    pub value: String,
}

impl Expression {
    pub fn new(value: impl Into<String>) -> Self {
        Expression {
            expr_type: "expression".into(),
            value: value.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl VariableInit {
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        VariableInit {
            name: Some(name.into()),
            value: Some(value.to_value()),
            extra: Extra::new(),
        }
    }

    /// The expression string of this initializer, when well-formed.
    pub fn expression_value(&self) -> Option<&str> {
        crate::expr::expression_value(self.value.as_ref()?)
    }
}
