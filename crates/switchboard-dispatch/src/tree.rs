//! Command tree construction.
//!
//! The platform models nested commands as a forest of at most three levels:
//! a top-level command, optional sub-command groups and sub-commands. Handler
//! records are folded into that shape by their name segments, reusing nodes
//! that share a prefix.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::path::path_to_string;
use crate::registry::HandlerRecord;

/// Maximum number of name segments a command may have.
pub const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("command '{command}' has too many parts! Maximum {max}.", max = MAX_DEPTH)]
    TooDeep { command: String, depth: usize },

    #[error("command '{command}' is declared twice")]
    Duplicate { command: String },

    #[error("command '{command}' conflicts with '{segment}', which is both a command and a group")]
    Conflict { command: String, segment: String },
}

/// A node of the command forest.
///
/// Leaves carry the handler record; groups carry children in first-seen
/// order.
#[derive(Debug, Clone)]
pub struct CommandTreeNode {
    pub segment: String,
    pub children: Vec<CommandTreeNode>,
    pub leaf: Option<Arc<HandlerRecord>>,
}

impl CommandTreeNode {
    fn group(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            children: Vec::new(),
            leaf: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// The leaf's description, or a generated one for groups.
    pub fn description(&self) -> String {
        match &self.leaf {
            Some(record) => record.description.clone(),
            None => format!("Description for {}", self.segment),
        }
    }

    pub fn child(&self, segment: &str) -> Option<&CommandTreeNode> {
        self.children.iter().find(|c| c.segment == segment)
    }

    /// Number of levels below and including this node.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }
}

/// Follows `path` from the roots of a forest.
pub fn find<'a>(roots: &'a [CommandTreeNode], path: &[String]) -> Option<&'a CommandTreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.iter().find(|n| &n.segment == first)?;
    for segment in rest {
        node = node.child(segment)?;
    }
    Some(node)
}

/// Builds the command forest from handler records.
///
/// Records with no name segments are skipped. Roots keep the order in which
/// their first record appeared.
pub fn build_tree(records: &[Arc<HandlerRecord>]) -> Result<Vec<CommandTreeNode>, TreeError> {
    let mut root = CommandTreeNode::group("");

    for record in records {
        let segments = &record.full_name;
        if segments.is_empty() {
            debug!("Skipping command with an empty name");
            continue;
        }
        let command = path_to_string(segments);
        if segments.len() > MAX_DEPTH {
            return Err(TreeError::TooDeep {
                command,
                depth: segments.len(),
            });
        }

        let mut node = &mut root;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let idx = match node.children.iter().position(|c| &c.segment == segment) {
                Some(idx) => {
                    let existing = &node.children[idx];
                    if last && existing.is_leaf() {
                        return Err(TreeError::Duplicate { command });
                    }
                    if last || existing.is_leaf() {
                        return Err(TreeError::Conflict {
                            command,
                            segment: segment.clone(),
                        });
                    }
                    idx
                }
                None => {
                    node.children.push(CommandTreeNode::group(segment.clone()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }
        node.leaf = Some(Arc::clone(record));
    }

    Ok(root.children)
}
