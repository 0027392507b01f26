//! Registration payload.
//!
//! Mirrors the platform's application-command JSON: top-level leaves carry
//! their options directly, nested leaves become sub-commands and nested
//! groups become sub-command groups.

use serde::Serialize;

use crate::model::{OptionChoice, OptionKind};
use crate::tree::CommandTreeNode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationCommandOption {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<bool>,
}

impl ApplicationCommandOption {
    fn branch(kind: OptionKind, node: &CommandTreeNode, options: Vec<Self>) -> Self {
        Self {
            kind,
            name: node.segment.clone(),
            description: node.description(),
            required: None,
            choices: Vec::new(),
            options,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: None,
        }
    }
}

/// Builds the upload payload for a command forest.
pub fn build_payload(roots: &[CommandTreeNode]) -> Vec<ApplicationCommand> {
    roots
        .iter()
        .map(|root| ApplicationCommand {
            name: root.segment.clone(),
            description: root.description(),
            options: match &root.leaf {
                Some(_) => leaf_options(root),
                None => root.children.iter().map(nested_option).collect(),
            },
        })
        .collect()
}

fn leaf_options(node: &CommandTreeNode) -> Vec<ApplicationCommandOption> {
    node.leaf
        .iter()
        .flat_map(|record| record.options())
        .map(|opt| opt.to_registration())
        .collect()
}

fn nested_option(node: &CommandTreeNode) -> ApplicationCommandOption {
    if node.is_leaf() {
        ApplicationCommandOption::branch(OptionKind::SubCommand, node, leaf_options(node))
    } else {
        let children = node.children.iter().map(nested_option).collect();
        ApplicationCommandOption::branch(OptionKind::SubCommandGroup, node, children)
    }
}
