//! Node type registry: per-type field and link contracts plus shared
//! constants, loaded from a versioned `node_definitions.json`.
//!
//! The registry is read-only. The built-in table is embedded at compile
//! time; callers that track a newer platform schema can load their own
//! file with [`Registry::from_path`] and pass it explicitly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::JourneyError;

const BUILTIN_JSON: &str = include_str!("node_definitions.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Expression,
    Object,
    Array,
    Number,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkContract {
    pub branch: Vec<String>,
    pub escape: Vec<String>,
}

impl LinkContract {
    pub fn is_empty(&self) -> bool {
        self.branch.is_empty() && self.escape.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeContract {
    pub required_fields: BTreeMap<String, FieldKind>,
    pub optional_fields: BTreeMap<String, FieldKind>,
    pub required_links: LinkContract,
    pub optional_links: Vec<String>,
    /// When true, link names outside the contract are violations.
    pub closed_links: bool,
    pub at_least_one_of: Vec<String>,
    pub is_terminal: bool,
    pub is_action: bool,
    pub deprecated: bool,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Constants {
    pub valid_link_types: Vec<String>,
    pub valid_presentation_values: Vec<String>,
    pub valid_std_functions: Vec<String>,
    pub valid_time_functions: Vec<String>,
    pub known_namespaces: Vec<String>,
    pub platform_implicit_variables: BTreeMap<String, String>,
    pub valid_condition_types: Vec<String>,
    pub valid_condition_data_types: Vec<String>,
    pub valid_journey_types: Vec<String>,
    pub valid_version_states: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    pub nodes: BTreeMap<String, NodeContract>,
    pub constants: Constants,
}

impl Registry {
    /// The compiled-in definitions table.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            serde_json::from_str(BUILTIN_JSON)
                .expect("embedded node_definitions.json must be valid")
        })
    }

    pub fn from_json(json: &str) -> Result<Registry, JourneyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Registry, JourneyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| JourneyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Registry::from_json(&text)
    }

    pub fn contract(&self, kind: &str) -> Option<&NodeContract> {
        self.nodes.get(kind)
    }

    pub fn is_terminal(&self, kind: &str) -> bool {
        self.contract(kind).is_some_and(|c| c.is_terminal)
    }

    pub fn is_action_kind(&self, kind: &str) -> bool {
        self.contract(kind).is_some_and(|c| c.is_action)
    }
}
