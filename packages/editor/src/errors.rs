//! Error types for the editor

use thiserror::Error;
use xedit_model::{ModelError, NodeId};

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    #[error("Node {node} is not {expected}")]
    WrongKind { node: NodeId, expected: &'static str },

    #[error("Contradictory ordering constraints among the children of {0}")]
    ContradictoryConstraint(NodeId),
}

impl EditorError {
    pub fn wrong_kind(node: NodeId, expected: &'static str) -> Self {
        EditorError::WrongKind { node, expected }
    }
}
