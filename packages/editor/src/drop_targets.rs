//! # Drop Targets
//!
//! Where a dragged element may land. A gap sits before every child other
//! than an empty placeholder text, and after the last child, of each
//! visible, expanded element. Gaps are
//! struck out when dropping there would be a no-op, would put the element
//! inside itself or inside read-only content, or would break the schema's
//! placement rules (`canDropTo`, `localDropOnly`, `mustBeBefore`,
//! `mustBeAfter`).
//!
//! The same list, with the dragged element marked in it, drives
//! "move up" and "move down": the element jumps to the nearest surviving
//! gap on either side.

use tracing::debug;
use xedit_model::{ElementRef, NodeId};
use xedit_schema::Schema;

use crate::harvest::HarvestCache;
use crate::view::View;

/// An insertion point: `index` in the child list of `parent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gap {
    pub parent: NodeId,
    pub index: usize,
}

impl Gap {
    pub fn new(parent: NodeId, index: usize) -> Self {
        Self { parent, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Gap(Gap),
    Dragged,
}

/// Gaps the element can be dropped into, in document order
pub fn drop_targets(view: &View, cache: &mut HarvestCache, schema: &Schema, dragged: NodeId) -> Vec<Gap> {
    slots(view, cache, schema, dragged)
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Gap(gap) => Some(gap),
            Slot::Dragged => None,
        })
        .collect()
}

/// Nearest allowed gap before the element
pub fn gap_above(view: &View, cache: &mut HarvestCache, schema: &Schema, id: NodeId) -> Option<Gap> {
    let slots = slots(view, cache, schema, id);
    let me = slots.iter().position(|s| *s == Slot::Dragged)?;
    slots[..me].iter().rev().find_map(|s| match s {
        Slot::Gap(gap) => Some(*gap),
        Slot::Dragged => None,
    })
}

/// Nearest allowed gap after the element
pub fn gap_below(view: &View, cache: &mut HarvestCache, schema: &Schema, id: NodeId) -> Option<Gap> {
    let slots = slots(view, cache, schema, id);
    let me = slots.iter().position(|s| *s == Slot::Dragged)?;
    slots[me + 1..].iter().find_map(|s| match s {
        Slot::Gap(gap) => Some(*gap),
        Slot::Dragged => None,
    })
}

/// Move `id` into `gap`. Indices count the element in its old place.
pub fn drop_into(view: &mut View, id: NodeId, gap: Gap) -> bool {
    let mut index = gap.index;
    if view.tree().parent_of(id) == Some(gap.parent) {
        if let Some(current) = view.tree().index_in_parent(id) {
            if current < index {
                index -= 1;
            }
        }
    }
    debug!(node = %id, parent = %gap.parent, index, "Dropping element");
    view.reparent(id, gap.parent, index)
}

fn slots(view: &View, cache: &mut HarvestCache, schema: &Schema, dragged: NodeId) -> Vec<Slot> {
    let mut all = Vec::new();
    for top in view.tops() {
        collect(view, top, dragged, &mut all);
    }

    let Some(harvest) = cache.harvest(view, dragged) else {
        return Vec::new();
    };
    let Some(el) = harvest.element() else {
        return Vec::new();
    };
    let def = schema.element(el.name());
    let can_drop_to = (def.can_drop_to)(el);
    let local_only = (def.local_drop_only)(el);
    let current_parent = view.tree().parent_of(dragged);
    let current_index = view.tree().index_in_parent(dragged);

    all.into_iter()
        .filter(|slot| {
            let Slot::Gap(gap) = slot else {
                return true;
            };
            if view.tree().is_ancestor_or_self(dragged, gap.parent) {
                return false;
            }
            if current_parent == Some(gap.parent) {
                if let Some(i) = current_index {
                    if gap.index == i || (gap.index > i && only_placeholders(view, gap.parent, i + 1, gap.index)) {
                        return false;
                    }
                }
            }
            if under_read_only(view, gap.parent) {
                return false;
            }
            if local_only && current_parent != Some(gap.parent) {
                return false;
            }
            let parent_kind = match view.tree().element(gap.parent) {
                Some(parent) => parent.name(),
                None => return false,
            };
            if !can_drop_to.iter().any(|k| k == parent_kind) {
                return false;
            }
            respects_order(view, schema, el, *gap)
        })
        .collect()
}

/// Gap walk over one element and its expanded descendants
fn collect(view: &View, id: NodeId, dragged: NodeId, out: &mut Vec<Slot>) {
    let state = view.state(id);
    if state.map(|s| s.invisible).unwrap_or(false) {
        return;
    }
    if state.map(|s| s.collapsed).unwrap_or(false) {
        return;
    }
    let children = view.tree().children(id);
    for (index, child) in children.iter().enumerate() {
        if is_placeholder(view, *child) {
            continue;
        }
        out.push(Slot::Gap(Gap::new(id, index)));
        if !view.tree().is_element(*child) {
            continue;
        }
        if *child == dragged {
            out.push(Slot::Dragged);
        }
        collect(view, *child, dragged, out);
    }
    out.push(Slot::Gap(Gap::new(id, children.len())));
}

/// Empty text between inline elements. A gap before one lands in the
/// same place as the gap after it.
fn is_placeholder(view: &View, id: NodeId) -> bool {
    view.tree().is_text(id) && view.tree().value(id).map(str::is_empty).unwrap_or(false)
}

fn only_placeholders(view: &View, parent: NodeId, from: usize, till: usize) -> bool {
    let children = view.tree().children(parent);
    children[from.min(children.len())..till.min(children.len())]
        .iter()
        .all(|c| is_placeholder(view, *c))
}

fn under_read_only(view: &View, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        let parent = view.tree().parent_of(node);
        if parent.is_some() && view.state(node).map(|s| s.read_only).unwrap_or(false) {
            return true;
        }
        current = parent;
    }
    false
}

/// Whether the gap respects the ordering lists of the element and of its
/// would-be siblings, asked as if the element already sat in the gap's
/// parent
fn respects_order(view: &View, schema: &Schema, el: ElementRef<'_>, gap: Gap) -> bool {
    let def = schema.element(el.name());
    let placed = el.with_parent(gap.parent);
    let before = def.before(placed);
    let after = def.after(placed);

    let siblings = view.tree().children(gap.parent);
    let split = gap.index.min(siblings.len());
    for sibling in elements_except(view, &siblings[..split], el.id()) {
        let sibling_def = schema.element(sibling.name());
        if before.iter().any(|k| k == sibling.name()) || sibling_def.after(sibling).iter().any(|k| k == el.name()) {
            return false;
        }
    }
    for sibling in elements_except(view, &siblings[split..], el.id()) {
        let sibling_def = schema.element(sibling.name());
        if after.iter().any(|k| k == sibling.name()) || sibling_def.before(sibling).iter().any(|k| k == el.name()) {
            return false;
        }
    }
    true
}

fn elements_except<'v>(view: &'v View, ids: &[NodeId], skip: NodeId) -> Vec<ElementRef<'v>> {
    ids.iter()
        .filter(|id| **id != skip)
        .filter_map(|id| view.tree().element(*id))
        .collect()
}
