//! Node-selector evaluation.
//!
//! Matches a twin's placement groups against the currently registered node
//! names. Evaluation is purely for display: it never decides where a device
//! is scheduled.

use crds::NodeSelector;
use std::fmt;
use tracing::warn;

/// Match operator of a node-selector requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    Gt,
    Lt,
    /// Anything outside the node-affinity operator set
    Other(String),
}

impl Operator {
    /// Parses the operator string found in a Device manifest.
    ///
    /// `notIn` and the Kubernetes spelling `NotIn` are both accepted.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "In" => Self::In,
            "notIn" | "NotIn" => Self::NotIn,
            "Exists" => Self::Exists,
            "DoesNotExist" => Self::DoesNotExist,
            "Gt" => Self::Gt,
            "Lt" => Self::Lt,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::In => "In",
            Self::NotIn => "notIn",
            Self::Exists => "Exists",
            Self::DoesNotExist => "DoesNotExist",
            Self::Gt => "Gt",
            Self::Lt => "Lt",
            Self::Other(raw) => raw,
        };
        f.write_str(s)
    }
}

/// One flattened match expression: an operator and its candidate values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementGroup {
    pub operator: Operator,
    pub values: Vec<String>,
}

impl PlacementGroup {
    pub fn new(operator: impl Into<Operator>, values: Vec<String>) -> Self {
        Self {
            operator: operator.into(),
            values,
        }
    }

    /// Flattens every match expression of every selector term, keeping
    /// declaration order.
    pub fn flatten(selector: Option<&NodeSelector>) -> Vec<Self> {
        selector
            .map(|selector| {
                selector
                    .node_selector_terms
                    .iter()
                    .flat_map(|term| term.match_expressions.iter())
                    .map(|expr| Self::new(expr.operator.as_str(), expr.values.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Returns the node names selected by `groups`, in evaluation order.
///
/// Every (operator, value) pair scans every node. A node matched by several
/// pairs is listed once per pair.
pub fn matching_nodes<S: AsRef<str>>(nodes: &[S], groups: &[PlacementGroup]) -> Vec<String> {
    let mut matched = Vec::new();

    for group in groups {
        match &group.operator {
            Operator::In | Operator::NotIn => {
                let wants_contained = group.operator == Operator::In;
                for value in &group.values {
                    matched.extend(
                        nodes
                            .iter()
                            .map(AsRef::as_ref)
                            .filter(|node| node.contains(value.as_str()) == wants_contained)
                            .map(str::to_string),
                    );
                }
            }
            Operator::Exists | Operator::DoesNotExist | Operator::Gt | Operator::Lt => {
                warn!("Selector operator {} is not implemented; no nodes matched", group.operator);
            }
            Operator::Other(raw) => {
                warn!("Selector operator {} is not in expected scope", raw);
            }
        }
    }

    matched
}

/// Renders a match list the way it appears in the dump and metric labels.
pub fn render_matches(matches: &[String]) -> String {
    matches.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{NodeSelectorRequirement, NodeSelectorTerm};

    fn nodes() -> Vec<String> {
        vec!["edge1-east".to_string(), "edge1-west".to_string(), "edge2-east".to_string()]
    }

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_in_matches_substring() {
        let groups = vec![PlacementGroup::new("In", values(&["edge1"]))];
        assert_eq!(matching_nodes(&nodes(), &groups), values(&["edge1-east", "edge1-west"]));
    }

    #[test]
    fn test_not_in_is_complement_of_containment() {
        // "edge1" is not equal to any node name, yet it still excludes both edge1 nodes
        let groups = vec![PlacementGroup::new("notIn", values(&["edge1"]))];
        assert_eq!(matching_nodes(&nodes(), &groups), values(&["edge2-east"]));
    }

    #[test]
    fn test_kubernetes_not_in_spelling() {
        assert_eq!(Operator::parse("NotIn"), Operator::NotIn);
        let groups = vec![PlacementGroup::new("NotIn", values(&["east"]))];
        assert_eq!(matching_nodes(&nodes(), &groups), values(&["edge1-west"]));
    }

    #[test]
    fn test_matches_are_not_deduplicated() {
        let groups = vec![PlacementGroup::new("In", values(&["edge1", "east"]))];
        let matched = matching_nodes(&nodes(), &groups);
        assert_eq!(
            matched,
            values(&["edge1-east", "edge1-west", "edge1-east", "edge2-east"])
        );
        assert_eq!(matched.iter().filter(|n| *n == "edge1-east").count(), 2);
    }

    #[test]
    fn test_unimplemented_operators_contribute_nothing() {
        for op in ["Exists", "DoesNotExist", "Gt", "Lt"] {
            let groups = vec![PlacementGroup::new(op, values(&["edge1"]))];
            assert!(matching_nodes(&nodes(), &groups).is_empty(), "{op} should match nothing");
        }
    }

    #[test]
    fn test_unknown_operator_contributes_nothing() {
        let groups = vec![
            PlacementGroup::new("Matches", values(&["edge"])),
            PlacementGroup::new("In", values(&["edge2"])),
        ];
        assert_eq!(matching_nodes(&nodes(), &groups), values(&["edge2-east"]));
        assert_eq!(Operator::parse("Matches"), Operator::Other("Matches".to_string()));
    }

    #[test]
    fn test_no_nodes_no_matches() {
        let groups = vec![PlacementGroup::new("notIn", values(&["edge1"]))];
        assert!(matching_nodes::<String>(&[], &groups).is_empty());
    }

    #[test]
    fn test_flatten_keeps_declaration_order() {
        let selector = NodeSelector {
            node_selector_terms: vec![
                NodeSelectorTerm {
                    match_expressions: vec![
                        NodeSelectorRequirement {
                            key: "name".to_string(),
                            operator: "In".to_string(),
                            values: values(&["a", "b"]),
                        },
                        NodeSelectorRequirement {
                            key: "zone".to_string(),
                            operator: "Exists".to_string(),
                            values: vec![],
                        },
                    ],
                },
                NodeSelectorTerm {
                    match_expressions: vec![NodeSelectorRequirement {
                        key: "name".to_string(),
                        operator: "notIn".to_string(),
                        values: values(&["c"]),
                    }],
                },
            ],
        };

        let groups = PlacementGroup::flatten(Some(&selector));
        assert_eq!(
            groups,
            vec![
                PlacementGroup::new(Operator::In, values(&["a", "b"])),
                PlacementGroup::new(Operator::Exists, vec![]),
                PlacementGroup::new(Operator::NotIn, values(&["c"])),
            ]
        );
        assert!(PlacementGroup::flatten(None).is_empty());
    }

    #[test]
    fn test_render_matches() {
        assert_eq!(render_matches(&values(&["a", "b", "a"])), "a, b, a");
        assert_eq!(render_matches(&[]), "");
    }
}
