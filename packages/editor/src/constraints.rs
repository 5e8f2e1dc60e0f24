//! # Ordering Constraints
//!
//! Siblings may declare kinds they must precede (`mustBeBefore`) and kinds
//! they must follow (`mustBeAfter`). The solver repairs an order by
//! adjacent swaps: find the first violation, swap once, rescan.
//!
//! A constraint set with a cycle (an item that must both precede and follow
//! a present kind, or two kinds that must each precede the other) has no
//! solution. It is reported instead of looped on, and callers leave the
//! order untouched.

use tracing::warn;
use xedit_model::NodeId;
use xedit_schema::Schema;

use crate::errors::{EditorError, EditorResult};
use crate::harvest::HarvestCache;
use crate::view::View;

/// One sibling as the solver sees it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sortable {
    pub kind: String,
    /// Kinds this item has to precede
    pub before: Vec<String>,
    /// Kinds this item has to follow
    pub after: Vec<String>,
}

impl Sortable {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_before(mut self, kinds: &[&str]) -> Self {
        self.before = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_after(mut self, kinds: &[&str]) -> Self {
        self.after = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    fn must_precede(&self, other: &Sortable) -> bool {
        self.before.contains(&other.kind) || other.after.contains(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contradiction {
    /// A kind caught in the cycle
    pub kind: String,
}

/// Permutation of `items` (as indices) satisfying every constraint
pub fn solve(items: &[Sortable]) -> Result<Vec<usize>, Contradiction> {
    if let Some(kind) = find_cycle(items) {
        return Err(Contradiction { kind });
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    let limit = items.len() * items.len() + items.len();
    let mut swaps = 0;
    while let Some((from, to)) = first_violation(items, &order) {
        if swaps == limit {
            // Acyclic constraints always have an answer; take it directly.
            return Ok(topological(items));
        }
        order.swap(from, to);
        swaps += 1;
    }
    Ok(order)
}

/// Whether the items, in this order, break no constraint
pub fn is_satisfied(items: &[Sortable], order: &[usize]) -> bool {
    first_violation(items, order).is_none()
}

fn first_violation(items: &[Sortable], order: &[usize]) -> Option<(usize, usize)> {
    for (pos, &index) in order.iter().enumerate() {
        let item = &items[index];
        if order[..pos].iter().any(|&q| item.before.contains(&items[q].kind)) {
            return Some((pos, pos - 1));
        }
        if order[pos + 1..].iter().any(|&q| item.after.contains(&items[q].kind)) {
            return Some((pos, pos + 1));
        }
    }
    None
}

fn find_cycle(items: &[Sortable]) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    fn visit(items: &[Sortable], node: usize, marks: &mut [Mark]) -> Option<usize> {
        marks[node] = Mark::Open;
        for next in 0..items.len() {
            if next == node || !items[node].must_precede(&items[next]) {
                continue;
            }
            match marks[next] {
                Mark::Open => return Some(next),
                Mark::New => {
                    if let Some(found) = visit(items, next, marks) {
                        return Some(found);
                    }
                }
                Mark::Done => {}
            }
        }
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; items.len()];
    for start in 0..items.len() {
        if marks[start] == Mark::New {
            if let Some(found) = visit(items, start, &mut marks) {
                return Some(items[found].kind.clone());
            }
        }
    }
    None
}

/// Stable topological order: among free items the earliest goes first
fn topological(items: &[Sortable]) -> Vec<usize> {
    let mut placed = vec![false; items.len()];
    let mut order = Vec::with_capacity(items.len());
    while order.len() < items.len() {
        let next = (0..items.len()).find(|&i| {
            !placed[i] && (0..items.len()).all(|j| placed[j] || j == i || !items[j].must_precede(&items[i]))
        });
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => break,
        }
    }
    order
}

/// Restore the declared order of an element's children.
///
/// Only element children move; text children keep their slots. Returns
/// whether anything moved.
pub fn reorder_children(
    view: &mut View,
    cache: &mut HarvestCache,
    schema: &Schema,
    parent: NodeId,
) -> EditorResult<bool> {
    let harvest = cache.harvest(view, parent).ok_or(EditorError::UnknownNode(parent))?;
    let el = harvest
        .element()
        .ok_or_else(|| EditorError::wrong_kind(parent, "an element"))?;

    let elements: Vec<_> = el.child_elements().collect();
    if !elements.iter().any(|c| schema.element(c.name()).has_ordering()) {
        return Ok(false);
    }
    let items: Vec<Sortable> = elements
        .iter()
        .map(|c| {
            let def = schema.element(c.name());
            Sortable {
                kind: c.name().to_string(),
                before: def.before(*c),
                after: def.after(*c),
            }
        })
        .collect();

    let order = match solve(&items) {
        Ok(order) => order,
        Err(contradiction) => {
            warn!(parent = %parent, kind = %contradiction.kind, "Contradictory ordering constraints, order left as is");
            return Err(EditorError::ContradictoryConstraint(parent));
        }
    };
    if order.iter().enumerate().all(|(i, o)| i == *o) {
        return Ok(false);
    }

    let mut sorted = order.iter().map(|&i| elements[i].id());
    let children: Vec<NodeId> = el
        .child_ids()
        .iter()
        .map(|&c| {
            if el.tree().is_element(c) {
                sorted.next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect();
    Ok(view.reorder_children(parent, children))
}

/// Put an element's attributes into declared order.
///
/// Undeclared attributes follow all declared ones.
pub fn reorder_attributes(view: &mut View, schema: &Schema, element: NodeId) -> EditorResult<bool> {
    let tree = view.tree();
    let el = tree
        .element(element)
        .ok_or_else(|| EditorError::wrong_kind(element, "an element"))?;
    let def = schema.element(el.name());
    let declared: Vec<&str> = def.attribute_names().collect();

    let attributes: Vec<_> = el.attributes().collect();
    let items: Vec<Sortable> = attributes
        .iter()
        .map(|at| {
            let name = at.name();
            match declared.iter().position(|d| *d == name) {
                Some(rank) => Sortable {
                    kind: name.to_string(),
                    before: declared[rank + 1..].iter().map(|d| d.to_string()).collect(),
                    after: declared[..rank].iter().map(|d| d.to_string()).collect(),
                },
                None => Sortable {
                    kind: name.to_string(),
                    before: Vec::new(),
                    after: declared.iter().map(|d| d.to_string()).collect(),
                },
            }
        })
        .collect();

    let order = solve(&items).map_err(|_| EditorError::ContradictoryConstraint(element))?;
    if order.iter().enumerate().all(|(i, o)| i == *o) {
        return Ok(false);
    }
    let reordered: Vec<NodeId> = order.iter().map(|&i| attributes[i].id()).collect();
    Ok(view.reorder_attributes(element, reordered))
}
