//! # Harvest
//!
//! Reconstructs model nodes from the view. A harvest is a copy of the whole
//! top-level tree the node lives in (so `parent()` and sibling queries work)
//! with view identities kept.
//!
//! Copies are memoized per top-level node for one view generation. Using the
//! cache after the view changed without clearing it is a programming error
//! and panics: a stale harvest would silently feed outdated nodes to the
//! next edit.

use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;
use xedit_model::{serialize_document, serialize_node, ElementRef, NodeId, NodeRef, Tree};

use crate::view::View;

/// A model node reconstructed from the view
#[derive(Clone)]
pub struct Harvest {
    tree: Rc<Tree>,
    id: NodeId,
}

impl Harvest {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn node(&self) -> Option<NodeRef<'_>> {
        self.tree.node(self.id)
    }

    pub fn element(&self) -> Option<ElementRef<'_>> {
        self.tree.element(self.id)
    }

    /// Canonical XML of the harvested node
    pub fn to_xml(&self) -> String {
        serialize_node(&self.tree, self.id)
    }
}

pub struct HarvestCache {
    generation: u64,
    snapshots: HashMap<NodeId, Rc<Tree>>,
}

impl HarvestCache {
    pub fn new(view: &View) -> Self {
        Self {
            generation: view.generation(),
            snapshots: HashMap::new(),
        }
    }

    /// Forget every harvest and follow the view's current generation
    pub fn clear(&mut self, view: &View) {
        self.snapshots.clear();
        self.generation = view.generation();
    }

    pub fn is_fresh(&self, view: &View) -> bool {
        self.generation == view.generation()
    }

    pub fn harvest(&mut self, view: &View, id: NodeId) -> Option<Harvest> {
        assert_eq!(
            self.generation,
            view.generation(),
            "harvest cache used after the view changed"
        );
        if !view.contains(id) {
            return None;
        }
        let top = view.tree().top(id);
        let tree = match self.snapshots.get(&top) {
            Some(tree) => tree.clone(),
            None => {
                let mut tree = Tree::new();
                view.tree().copy_subtree(top, &mut tree, true)?;
                trace!(top = %top, nodes = tree.len(), "Harvested");
                let tree = Rc::new(tree);
                self.snapshots.insert(top, tree.clone());
                tree
            }
        };
        Some(Harvest { tree, id })
    }

    /// Whole document as XML, namespace declarations hoisted to the root
    pub fn harvest_document(&mut self, view: &View) -> String {
        match self.harvest(view, view.root_id()) {
            Some(harvest) => serialize_document(harvest.tree(), harvest.id(), view.namespaces()),
            None => view.to_xml(),
        }
    }
}
