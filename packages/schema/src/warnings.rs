use serde::Serialize;
use xedit_model::NodeId;

/// A validation message attached to a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub node: NodeId,
    pub text: String,
}

/// Collector handed to the validation callback
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId, text: impl Into<String>) {
        self.items.push(Warning {
            node,
            text: text.into(),
        });
    }

    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &Warning> {
        self.items.iter().filter(move |w| w.node == node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
