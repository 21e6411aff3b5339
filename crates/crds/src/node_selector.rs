//! Node placement types
//!
//! Mirrors the core/v1 `NodeSelector` shape so the Device schema can be
//! generated without pulling k8s-openapi schema support.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ORed list of selector terms
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    #[serde(default)]
    pub node_selector_terms: Vec<NodeSelectorTerm>,
}

/// ANDed list of requirements
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorTerm {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<NodeSelectorRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct NodeSelectorRequirement {
    /// Label key the requirement applies to
    #[serde(default)]
    pub key: String,

    /// One of `In`, `NotIn`, `Exists`, `DoesNotExist`, `Gt`, `Lt`
    pub operator: String,

    /// Candidate values (empty for `Exists`/`DoesNotExist`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}
