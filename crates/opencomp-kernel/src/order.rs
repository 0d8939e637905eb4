//! Ordering subsystem: explicit per-parent sibling order.
//!
//! Each parent stores one order list per child kind, keyed by
//! `(parent, kind)`. Competency areas are the exception to "one list per
//! effective parent": a subject area's single list holds every competency
//! area beneath it, and a subdiscipline area sees the scoped slice of that
//! list holding its own competency areas.
//!
//! Field edits never touch order lists, so no save can perturb ordering.
//! Lists read back from persistence are checked against the live children
//! with `check_orders` and repaired with `reconcile_orders`.

use crate::error::TaxonomyError;
use crate::node::{Node, NodeId, NodeKind};
use crate::tree::Taxonomy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Direction for a single-step move among siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("unknown direction `{s}` (expected up or down)")),
        }
    }
}

/// Order lists keyed by `(parent, child kind)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderStore {
    lists: BTreeMap<(NodeId, NodeKind), Vec<NodeId>>,
}

impl OrderStore {
    pub fn get(&self, parent: NodeId, kind: NodeKind) -> &[NodeId] {
        self.lists
            .get(&(parent, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace one list. An empty list removes the entry.
    pub fn set(&mut self, parent: NodeId, kind: NodeKind, ids: Vec<NodeId>) {
        if ids.is_empty() {
            self.lists.remove(&(parent, kind));
        } else {
            self.lists.insert((parent, kind), ids);
        }
    }

    pub fn push(&mut self, parent: NodeId, kind: NodeKind, id: NodeId) {
        self.lists.entry((parent, kind)).or_default().push(id);
    }

    /// Iterate lists in deterministic key order.
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, NodeKind, &[NodeId])> {
        self.lists
            .iter()
            .map(|((parent, kind), ids)| (*parent, *kind, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// Difference between a stored order list and the live children it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDrift {
    pub parent: NodeId,
    pub kind: NodeKind,
    /// Ids in the list with no matching live child.
    pub stale: Vec<NodeId>,
    /// Live children absent from the list.
    pub missing: Vec<NodeId>,
    /// Ids listed more than once.
    pub duplicates: Vec<NodeId>,
}

impl OrderDrift {
    pub fn is_clean(&self) -> bool {
        self.stale.is_empty() && self.missing.is_empty() && self.duplicates.is_empty()
    }
}

/// Normalize `stored` against `members`: keep the first occurrence of each
/// live id in stored order, then append missing ids in id order.
fn reconcile_list(
    parent: NodeId,
    kind: NodeKind,
    stored: &[NodeId],
    members: &[NodeId],
) -> (Vec<NodeId>, OrderDrift) {
    let live: BTreeSet<NodeId> = members.iter().copied().collect();
    let mut seen = BTreeSet::new();
    let mut list = Vec::with_capacity(members.len());
    let mut drift = OrderDrift {
        parent,
        kind,
        stale: Vec::new(),
        missing: Vec::new(),
        duplicates: Vec::new(),
    };

    for id in stored {
        if !live.contains(id) {
            drift.stale.push(*id);
        } else if !seen.insert(*id) {
            drift.duplicates.push(*id);
        } else {
            list.push(*id);
        }
    }
    for id in members {
        if !seen.contains(id) {
            drift.missing.push(*id);
            list.push(*id);
        }
    }

    (list, drift)
}

fn validate_permutation(
    parent: NodeId,
    kind: NodeKind,
    expected: &[NodeId],
    proposed: &[NodeId],
) -> Result<(), TaxonomyError> {
    let invalid = |reason: String| TaxonomyError::InvalidOrder {
        parent,
        kind,
        reason,
    };
    let live: BTreeSet<NodeId> = expected.iter().copied().collect();
    let mut seen = BTreeSet::new();
    for id in proposed {
        if !live.contains(id) {
            return Err(invalid(format!("id {id} is not a live child")));
        }
        if !seen.insert(*id) {
            return Err(invalid(format!("id {id} appears more than once")));
        }
    }
    if let Some(missing) = expected.iter().find(|id| !seen.contains(id)) {
        return Err(invalid(format!("id {missing} is missing")));
    }
    Ok(())
}

impl Taxonomy {
    /// Resolve which node stores the `kind` list visible from `parent`.
    fn order_owner(&self, parent: NodeId, kind: NodeKind) -> Result<NodeId, TaxonomyError> {
        let parent_node = self.node(parent)?;
        if !parent_node.kind().accepts_child(kind) {
            return Err(TaxonomyError::InvalidParent(format!(
                "{kind} cannot be placed under {}",
                parent_node.kind()
            )));
        }
        match &parent_node.body {
            crate::node::NodeBody::SubdisciplineArea { subject_area }
                if kind == NodeKind::CompetencyArea =>
            {
                Ok(*subject_area)
            }
            _ => Ok(parent),
        }
    }

    fn effective_parent_of(&self, id: &NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent_id)
    }

    /// The stored list for `(owner, kind)`, reconciled against live nodes.
    fn normalized_list(&self, owner: NodeId, kind: NodeKind) -> Vec<NodeId> {
        let members = self.scan_order_members(owner, kind);
        reconcile_list(owner, kind, self.orders.get(owner, kind), &members).0
    }

    /// The order list of `kind` children as seen from `parent`.
    ///
    /// For the list a parent owns this is the full stored list; a
    /// subdiscipline area gets the slice of its subject area's competency
    /// list holding its own competency areas.
    pub fn get_order(&self, parent: NodeId, kind: NodeKind) -> Result<Vec<NodeId>, TaxonomyError> {
        let owner = self.order_owner(parent, kind)?;
        let list = self.orders.get(owner, kind);
        if owner == parent {
            return Ok(list.to_vec());
        }
        Ok(list
            .iter()
            .copied()
            .filter(|id| self.effective_parent_of(id) == Some(parent))
            .collect())
    }

    /// Ids in the `kind` list whose effective parent is `parent`.
    ///
    /// Differs from `get_order` only for a subject area's competency areas,
    /// where it excludes those filed under a subdiscipline area.
    pub fn scoped_order(
        &self,
        parent: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        let owner = self.order_owner(parent, kind)?;
        Ok(self
            .orders
            .get(owner, kind)
            .iter()
            .copied()
            .filter(|id| self.effective_parent_of(id) == Some(parent))
            .collect())
    }

    /// Replace the `kind` order under `parent`.
    ///
    /// `sequence` must be a permutation of exactly the ids `get_order`
    /// covers. A subdiscipline-scoped sequence is written back into the
    /// slots its ids occupy in the shared list. Returns whether the stored
    /// order changed.
    pub fn set_order(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        sequence: Vec<NodeId>,
    ) -> Result<bool, TaxonomyError> {
        let owner = self.order_owner(parent, kind)?;
        let expected = if owner == parent {
            self.scan_order_members(owner, kind)
        } else {
            self.scan_children(parent, kind)
        };
        validate_permutation(parent, kind, &expected, &sequence)?;

        let current = self.normalized_list(owner, kind);
        let next = if owner == parent {
            sequence
        } else {
            let scope: BTreeSet<NodeId> = expected.iter().copied().collect();
            let mut replacements = sequence.into_iter();
            current
                .iter()
                .map(|id| {
                    if scope.contains(id) {
                        replacements.next().unwrap_or(*id)
                    } else {
                        *id
                    }
                })
                .collect()
        };

        let changed = next.as_slice() != self.orders.get(owner, kind);
        self.orders.set(owner, kind, next);
        if changed {
            tracing::debug!(parent = %parent, %kind, "order replaced");
        }
        Ok(changed)
    }

    /// Swap `child` with its neighbour among its siblings.
    ///
    /// The neighbour is chosen within the child's sibling scope (its
    /// effective parent); the swap is applied to the stored list by
    /// position. Moving the first child up or the last child down is a
    /// no-op. Returns whether anything moved.
    pub fn move_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        direction: Direction,
    ) -> Result<bool, TaxonomyError> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        let kind = child_node.kind();
        let (Some(effective), Some(owner)) =
            (child_node.parent_id(), child_node.body.order_parent())
        else {
            return Err(TaxonomyError::InvalidParent(format!(
                "{} is a root and has no siblings",
                child_node.reference()
            )));
        };
        if parent != effective && parent != owner {
            return Err(TaxonomyError::InvalidParent(format!(
                "node {child} is not a child of node {parent}"
            )));
        }

        let mut list = self.normalized_list(owner, kind);
        let scope: Vec<NodeId> = list
            .iter()
            .copied()
            .filter(|id| self.effective_parent_of(id) == Some(effective))
            .collect();
        let Some(index) = scope.iter().position(|id| *id == child) else {
            return Err(TaxonomyError::node_not_found(child));
        };
        let neighbour = match direction {
            Direction::Up => index.checked_sub(1).map(|i| scope[i]),
            Direction::Down => scope.get(index + 1).copied(),
        };
        let Some(neighbour) = neighbour else {
            return Ok(false);
        };

        let (Some(a), Some(b)) = (
            list.iter().position(|id| *id == child),
            list.iter().position(|id| *id == neighbour),
        ) else {
            return Err(TaxonomyError::node_not_found(neighbour));
        };
        list.swap(a, b);
        self.orders.set(owner, kind, list);
        tracing::debug!(child = %child, neighbour = %neighbour, %direction, "child moved");
        Ok(true)
    }

    fn order_membership(&self) -> BTreeMap<(NodeId, NodeKind), Vec<NodeId>> {
        let mut members: BTreeMap<(NodeId, NodeKind), Vec<NodeId>> = BTreeMap::new();
        for node in self.nodes.values() {
            if let Some(owner) = node.body.order_parent() {
                members.entry((owner, node.kind())).or_default().push(node.id);
            }
        }
        for (owner, kind, _) in self.orders.entries() {
            members.entry((owner, kind)).or_default();
        }
        members
    }

    /// Report every order list that is not a permutation of its live
    /// children. Does not modify anything.
    pub fn check_orders(&self) -> Vec<OrderDrift> {
        self.order_membership()
            .into_iter()
            .map(|((owner, kind), members)| {
                reconcile_list(owner, kind, self.orders.get(owner, kind), &members).1
            })
            .filter(|drift| !drift.is_clean())
            .collect()
    }

    /// Repair every drifted order list: stale ids and duplicates are
    /// dropped, missing children appended in id order. Returns what was
    /// repaired.
    pub fn reconcile_orders(&mut self) -> Vec<OrderDrift> {
        let mut repaired = Vec::new();
        for ((owner, kind), members) in self.order_membership() {
            let (list, drift) = reconcile_list(owner, kind, self.orders.get(owner, kind), &members);
            if !drift.is_clean() {
                tracing::warn!(
                    parent = %owner,
                    %kind,
                    stale = drift.stale.len(),
                    missing = drift.missing.len(),
                    duplicates = drift.duplicates.len(),
                    "order list drifted from live children; repaired"
                );
                self.orders.set(owner, kind, list);
                repaired.push(drift);
            }
        }
        repaired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeFields;
    use crate::testing::sample;
    use crate::tree::TaxonomyParts;

    #[test]
    fn set_order_roundtrips_a_permutation() {
        let mut s = sample();
        let seq = vec![s.sda_ca, s.geometry, s.algebra];
        let changed = s
            .taxonomy
            .set_order(s.math, NodeKind::CompetencyArea, seq.clone())
            .expect("permutation should be accepted");
        assert!(changed);
        assert_eq!(s.taxonomy.get_order(s.math, NodeKind::CompetencyArea), Ok(seq));
    }

    #[test]
    fn set_order_rejects_omissions_duplicates_and_strangers() {
        let mut s = sample();
        let before = s.taxonomy.clone();

        for bad in [
            vec![s.algebra, s.geometry],
            vec![s.algebra, s.algebra, s.geometry, s.sda_ca],
            vec![s.algebra, s.geometry, s.sda_ca, s.eu],
        ] {
            let err = s
                .taxonomy
                .set_order(s.math, NodeKind::CompetencyArea, bad)
                .expect_err("non-permutation must be rejected");
            assert!(matches!(err, TaxonomyError::InvalidOrder { .. }));
        }
        assert_eq!(s.taxonomy, before);
    }

    #[test]
    fn move_up_swaps_with_previous_sibling() {
        let mut s = sample();
        let c3 = s
            .taxonomy
            .insert_child(s.math, NodeKind::CompetencyArea, NodeFields::labeled("Statistics"))
            .expect("create should work");
        assert_eq!(
            s.taxonomy.scoped_order(s.math, NodeKind::CompetencyArea),
            Ok(vec![s.algebra, s.geometry, c3])
        );

        let moved = s
            .taxonomy
            .move_child(s.math, s.geometry, Direction::Up)
            .expect("move should work");
        assert!(moved);
        assert_eq!(
            s.taxonomy.scoped_order(s.math, NodeKind::CompetencyArea),
            Ok(vec![s.geometry, s.algebra, c3])
        );
    }

    #[test]
    fn moves_at_the_boundary_are_noops() {
        let mut s = sample();
        let before = s.taxonomy.get_order(s.math, NodeKind::CompetencyArea);

        assert_eq!(
            s.taxonomy.move_child(s.math, s.algebra, Direction::Up),
            Ok(false)
        );
        // geometry is the last general competency area even though a
        // subdiscipline one follows it in the shared list
        assert_eq!(
            s.taxonomy.move_child(s.math, s.geometry, Direction::Down),
            Ok(false)
        );
        assert_eq!(s.taxonomy.get_order(s.math, NodeKind::CompetencyArea), before);
    }

    #[test]
    fn scoped_move_swaps_positions_in_the_shared_list() {
        let mut s = sample();
        let second = s
            .taxonomy
            .insert_child(s.sda, NodeKind::CompetencyArea, NodeFields::labeled("Optics"))
            .expect("create should work");
        // shared list: algebra, geometry, sda_ca, second
        s.taxonomy
            .set_order(
                s.math,
                NodeKind::CompetencyArea,
                vec![s.sda_ca, s.algebra, s.geometry, second],
            )
            .expect("reorder should work");

        let moved = s
            .taxonomy
            .move_child(s.sda, second, Direction::Up)
            .expect("move should work");
        assert!(moved);
        assert_eq!(
            s.taxonomy.get_order(s.math, NodeKind::CompetencyArea),
            Ok(vec![second, s.algebra, s.geometry, s.sda_ca])
        );
        assert_eq!(
            s.taxonomy.get_order(s.sda, NodeKind::CompetencyArea),
            Ok(vec![second, s.sda_ca])
        );
    }

    #[test]
    fn scoped_set_order_rewrites_only_its_slots() {
        let mut s = sample();
        let second = s
            .taxonomy
            .insert_child(s.sda, NodeKind::CompetencyArea, NodeFields::labeled("Optics"))
            .expect("create should work");

        let err = s
            .taxonomy
            .set_order(s.sda, NodeKind::CompetencyArea, vec![s.sda_ca, s.algebra])
            .expect_err("general competency areas are outside the scope");
        assert!(matches!(err, TaxonomyError::InvalidOrder { .. }));

        s.taxonomy
            .set_order(s.sda, NodeKind::CompetencyArea, vec![second, s.sda_ca])
            .expect("scoped reorder should work");
        assert_eq!(
            s.taxonomy.get_order(s.math, NodeKind::CompetencyArea),
            Ok(vec![s.algebra, s.geometry, second, s.sda_ca])
        );
    }

    #[test]
    fn move_rejects_a_foreign_parent() {
        let mut s = sample();
        let err = s
            .taxonomy
            .move_child(s.english, s.algebra, Direction::Up)
            .expect_err("english does not hold algebra");
        assert!(matches!(err, TaxonomyError::InvalidParent(_)));
    }

    #[test]
    fn reconcile_repairs_stale_missing_and_duplicate_ids() {
        let s = sample();
        let mut parts = s.taxonomy.to_parts();
        for (parent, kind, ids) in parts.orders.iter_mut() {
            if *parent == s.math && *kind == NodeKind::CompetencyArea {
                *ids = vec![NodeId(404), s.geometry, s.geometry];
            }
        }
        let mut taxonomy = Taxonomy::from_parts(parts);

        let drift = taxonomy.check_orders();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].stale, vec![NodeId(404)]);
        assert_eq!(drift[0].duplicates, vec![s.geometry]);
        assert_eq!(drift[0].missing, vec![s.algebra, s.sda_ca]);

        let repaired = taxonomy.reconcile_orders();
        assert_eq!(repaired, drift);
        assert_eq!(
            taxonomy.get_order(s.math, NodeKind::CompetencyArea),
            Ok(vec![s.geometry, s.algebra, s.sda_ca])
        );
        assert!(taxonomy.check_orders().is_empty());
    }

    #[test]
    fn reconcile_is_quiet_on_a_consistent_taxonomy() {
        let mut s = sample();
        assert!(s.taxonomy.check_orders().is_empty());
        assert!(s.taxonomy.reconcile_orders().is_empty());
        let empty = Taxonomy::from_parts(TaxonomyParts::default());
        assert!(empty.check_orders().is_empty());
    }
}
