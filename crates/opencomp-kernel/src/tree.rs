//! The taxonomy tree: canonical in-memory state and traversal primitives.
//!
//! `Taxonomy` owns every node, the order lists, editor profiles, and
//! pathways. Traversal follows the static edges declared by
//! `NodeKind::child_kinds`; children are always returned in stored order.

use crate::error::TaxonomyError;
use crate::node::{ActorId, LevelType, Node, NodeBody, NodeFields, NodeId, NodeKind};
use crate::order::OrderStore;
use crate::pathway::{Pathway, PathwayId};
use crate::permission::UserProfile;
use std::collections::BTreeMap;

/// Canonical in-memory taxonomy state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) orders: OrderStore,
    pub(crate) profiles: BTreeMap<ActorId, UserProfile>,
    pub(crate) pathways: BTreeMap<PathwayId, Pathway>,
    pub(crate) next_id: u64,
}

/// Loose parts of a taxonomy, as read back from persistence.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyParts {
    pub next_id: u64,
    pub nodes: Vec<Node>,
    pub orders: Vec<(NodeId, NodeKind, Vec<NodeId>)>,
    pub profiles: Vec<UserProfile>,
    pub pathways: Vec<Pathway>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a taxonomy from persisted parts.
    ///
    /// Duplicate ids resolve last-write-wins. The id counter is raised past
    /// every id seen so new nodes never collide. Order lists are taken as
    /// stored; callers reconcile them with `reconcile_orders`.
    pub fn from_parts(parts: TaxonomyParts) -> Self {
        let mut taxonomy = Taxonomy {
            next_id: parts.next_id,
            ..Taxonomy::default()
        };
        for node in parts.nodes {
            taxonomy.next_id = taxonomy.next_id.max(node.id.0 + 1);
            taxonomy.nodes.insert(node.id, node);
        }
        for pathway in parts.pathways {
            taxonomy.next_id = taxonomy.next_id.max(pathway.id.0 + 1);
            taxonomy.pathways.insert(pathway.id, pathway);
        }
        for profile in parts.profiles {
            taxonomy.profiles.insert(profile.actor.clone(), profile);
        }
        for (parent, kind, ids) in parts.orders {
            taxonomy.orders.set(parent, kind, ids);
        }
        taxonomy
    }

    /// Split into persisted parts in deterministic order.
    pub fn to_parts(&self) -> TaxonomyParts {
        TaxonomyParts {
            next_id: self.next_id,
            nodes: self.nodes.values().cloned().collect(),
            orders: self
                .orders
                .entries()
                .map(|(parent, kind, ids)| (parent, kind, ids.to_vec()))
                .collect(),
            profiles: self.profiles.values().cloned().collect(),
            pathways: self.pathways.values().cloned().collect(),
        }
    }

    /// Run `f` against this taxonomy as one unit: on error every change it
    /// made is rolled back.
    pub fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut Taxonomy) -> Result<T, TaxonomyError>,
    ) -> Result<T, TaxonomyError> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::debug!(error = %err, "taxonomy transaction rolled back");
                *self = snapshot;
                Err(err)
            }
        }
    }

    pub(crate) fn allocate_id(&mut self) -> u64 {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate schools in id order.
    pub fn schools(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .values()
            .filter(|node| node.kind() == NodeKind::School)
    }

    /// Lookup one node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node, TaxonomyError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| TaxonomyError::node_not_found(id))
    }

    /// Lookup one node by id, requiring a specific kind.
    pub fn node_of_kind(&self, kind: NodeKind, id: NodeId) -> Result<&Node, TaxonomyError> {
        match self.nodes.get(&id) {
            Some(node) if node.kind() == kind => Ok(node),
            _ => Err(TaxonomyError::kind_not_found(kind, id)),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TaxonomyError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| TaxonomyError::node_not_found(id))
    }

    /// The effective parent of a node (`None` for schools).
    pub fn parent(&self, id: NodeId) -> Result<Option<&Node>, TaxonomyError> {
        match self.node(id)?.parent_id() {
            Some(parent) => self.node(parent).map(Some),
            None => Ok(None),
        }
    }

    /// Strict ancestors, nearest first, ending at the school.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>, TaxonomyError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent_id();
        while let Some(parent) = current {
            if chain.contains(&parent) {
                return Err(TaxonomyError::InvalidParent(format!(
                    "cycle through node {parent}"
                )));
            }
            chain.push(parent);
            current = self.node(parent)?.parent_id();
        }
        Ok(chain)
    }

    /// Distance from the school (schools are depth 0).
    pub fn depth(&self, id: NodeId) -> Result<usize, TaxonomyError> {
        Ok(self.ancestors(id)?.len())
    }

    /// The school owning a node.
    pub fn school_of(&self, id: NodeId) -> Result<NodeId, TaxonomyError> {
        let node = self.node(id)?;
        if node.kind() == NodeKind::School {
            return Ok(id);
        }
        self.ancestors(id)?
            .last()
            .copied()
            .ok_or_else(|| {
                TaxonomyError::InvalidParent(format!("{} has no school", node.reference()))
            })
    }

    /// The subject area a node sits under, if it is at or below that level.
    pub fn subject_area_of(&self, id: NodeId) -> Result<Option<NodeId>, TaxonomyError> {
        let node = self.node(id)?;
        if node.kind() == NodeKind::SubjectArea {
            return Ok(Some(id));
        }
        for ancestor in self.ancestors(id)? {
            if self.node(ancestor)?.kind() == NodeKind::SubjectArea {
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }

    /// Ids of the live children of `kind` directly under `parent`, in
    /// stored order.
    pub fn child_ids(&self, parent: NodeId, kind: NodeKind) -> Result<Vec<NodeId>, TaxonomyError> {
        let parent_node = self.node(parent)?;
        if !parent_node.kind().accepts_child(kind) {
            return Err(TaxonomyError::InvalidParent(format!(
                "{kind} cannot be placed under {}",
                parent_node.kind()
            )));
        }
        self.scoped_order(parent, kind)
    }

    /// The live children of `kind` directly under `parent`, in stored order.
    pub fn children(&self, parent: NodeId, kind: NodeKind) -> Result<Vec<&Node>, TaxonomyError> {
        self.child_ids(parent, kind)?
            .into_iter()
            .map(|id| self.node(id))
            .collect()
    }

    /// Every descendant of `id` in pre-order, following the static edges.
    ///
    /// Children are found through their parent links, so a node missing
    /// from its order list is still reached.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, TaxonomyError> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out)?;
        Ok(out)
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) -> Result<(), TaxonomyError> {
        let kind = self.node(id)?.kind();
        for child_kind in kind.child_kinds() {
            for child in self.scan_children(id, *child_kind) {
                out.push(child);
                self.collect_descendants(child, out)?;
            }
        }
        Ok(())
    }

    /// Live ids whose effective parent is `parent`, in id order.
    pub(crate) fn scan_children(&self, parent: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.kind() == kind && node.parent_id() == Some(parent))
            .map(|node| node.id)
            .collect()
    }

    /// Live ids whose order list is owned by `owner`, in id order.
    pub(crate) fn scan_order_members(&self, owner: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.kind() == kind && node.body.order_parent() == Some(owner))
            .map(|node| node.id)
            .collect()
    }

    /// Insert a school owned by `owner`. Permission handling lives in `gate`.
    pub(crate) fn insert_school(&mut self, name: impl Into<String>, owner: ActorId) -> NodeId {
        let id = NodeId(self.allocate_id());
        let body = NodeBody::School {
            owner,
            alias_ca: crate::node::DEFAULT_ALIAS_CA.to_string(),
            alias_eu: crate::node::DEFAULT_ALIAS_EU.to_string(),
        };
        self.nodes.insert(id, Node::new(id, name, body));
        id
    }

    /// Insert a new private node of `kind` under `parent`, appending it to
    /// the end of its order list.
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        fields: NodeFields,
    ) -> Result<NodeId, TaxonomyError> {
        let parent_node = self.node(parent)?;
        let parent_kind = parent_node.kind();
        if !parent_kind.accepts_child(kind) {
            return Err(TaxonomyError::InvalidParent(format!(
                "{kind} cannot be placed under {parent_kind}"
            )));
        }

        let label = fields
            .label
            .clone()
            .ok_or(TaxonomyError::MissingField { kind, field: "label" })?;
        if fields.student_friendly.is_some() && !kind.supports_student_friendly() {
            return Err(TaxonomyError::FieldNotSupported {
                kind,
                field: "student_friendly",
            });
        }
        if fields.level_type.is_some() && kind != NodeKind::Level {
            return Err(TaxonomyError::FieldNotSupported {
                kind,
                field: "level_type",
            });
        }

        let body = match kind {
            NodeKind::School => {
                return Err(TaxonomyError::InvalidParent(
                    "schools are roots and have no parent".to_string(),
                ));
            }
            NodeKind::SubjectArea => NodeBody::SubjectArea { school: parent },
            NodeKind::SubdisciplineArea => NodeBody::SubdisciplineArea {
                subject_area: parent,
            },
            NodeKind::CompetencyArea => match &parent_node.body {
                NodeBody::SubdisciplineArea { subject_area } => NodeBody::CompetencyArea {
                    subject_area: *subject_area,
                    subdiscipline_area: Some(parent),
                },
                _ => NodeBody::CompetencyArea {
                    subject_area: parent,
                    subdiscipline_area: None,
                },
            },
            NodeKind::Level => {
                let level_type = fields.level_type.ok_or(TaxonomyError::MissingField {
                    kind,
                    field: "level_type",
                })?;
                self.ensure_level_unique(parent, level_type, None)?;
                NodeBody::Level {
                    competency_area: parent,
                    level_type,
                }
            }
            NodeKind::EssentialUnderstanding => NodeBody::EssentialUnderstanding {
                competency_area: parent,
            },
            NodeKind::LearningTarget => NodeBody::LearningTarget {
                essential_understanding: parent,
            },
        };

        let id = NodeId(self.allocate_id());
        let mut node = Node::new(id, label, body);
        if let Some(description) = fields.description {
            node.description = description;
        }
        if let Some(student_friendly) = fields.student_friendly {
            node.student_friendly = student_friendly;
        }
        let order_parent = node.body.order_parent().unwrap_or(parent);
        self.nodes.insert(id, node);
        self.orders.push(order_parent, kind, id);
        tracing::debug!(node = %id, %kind, parent = %parent, "node created");
        Ok(id)
    }

    /// Apply field edits to one node. Never touches `public` or any order
    /// list. Returns whether anything changed.
    pub(crate) fn apply_fields(
        &mut self,
        id: NodeId,
        fields: NodeFields,
    ) -> Result<bool, TaxonomyError> {
        let node = self.node(id)?;
        let kind = node.kind();
        if fields.student_friendly.is_some() && !kind.supports_student_friendly() {
            return Err(TaxonomyError::FieldNotSupported {
                kind,
                field: "student_friendly",
            });
        }
        if let Some(level_type) = fields.level_type {
            match &node.body {
                NodeBody::Level {
                    competency_area, ..
                } => self.ensure_level_unique(*competency_area, level_type, Some(id))?,
                _ => {
                    return Err(TaxonomyError::FieldNotSupported {
                        kind,
                        field: "level_type",
                    });
                }
            }
        }

        let node = self.node_mut(id)?;
        let mut changed = false;
        if let Some(label) = fields.label
            && node.label != label
        {
            node.label = label;
            changed = true;
        }
        if let Some(description) = fields.description
            && node.description != description
        {
            node.description = description;
            changed = true;
        }
        if let Some(student_friendly) = fields.student_friendly
            && node.student_friendly != student_friendly
        {
            node.student_friendly = student_friendly;
            changed = true;
        }
        if let Some(new_type) = fields.level_type
            && let NodeBody::Level { level_type, .. } = &mut node.body
            && *level_type != new_type
        {
            *level_type = new_type;
            changed = true;
        }
        if changed {
            node.touch_updated_at();
        }
        Ok(changed)
    }

    /// Update the display aliases a school uses for its level names.
    pub(crate) fn apply_school_aliases(
        &mut self,
        school: NodeId,
        alias_ca: Option<String>,
        alias_eu: Option<String>,
    ) -> Result<bool, TaxonomyError> {
        self.node_of_kind(NodeKind::School, school)?;
        let node = self.node_mut(school)?;
        let mut changed = false;
        if let NodeBody::School {
            alias_ca: current_ca,
            alias_eu: current_eu,
            ..
        } = &mut node.body
        {
            if let Some(alias) = alias_ca
                && *current_ca != alias
            {
                *current_ca = alias;
                changed = true;
            }
            if let Some(alias) = alias_eu
                && *current_eu != alias
            {
                *current_eu = alias;
                changed = true;
            }
        }
        if changed {
            node.touch_updated_at();
        }
        Ok(changed)
    }

    fn ensure_level_unique(
        &self,
        competency_area: NodeId,
        level_type: LevelType,
        except: Option<NodeId>,
    ) -> Result<(), TaxonomyError> {
        let clash = self.nodes.values().any(|node| {
            Some(node.id) != except
                && matches!(
                    node.body,
                    NodeBody::Level { competency_area: ca, level_type: lt }
                        if ca == competency_area && lt == level_type
                )
        });
        if clash {
            return Err(TaxonomyError::UniquenessViolation {
                description: format!(
                    "competency_area {competency_area} already has a {level_type} level"
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample;

    #[test]
    fn ancestors_run_nearest_first_through_subdiscipline() {
        let s = sample();
        let chain = s.taxonomy.ancestors(s.sda_ca).expect("ancestors should resolve");
        assert_eq!(chain, vec![s.sda, s.math, s.school]);
        assert_eq!(s.taxonomy.depth(s.sda_ca), Ok(3));
        assert_eq!(s.taxonomy.school_of(s.lt), Ok(s.school));
        assert_eq!(s.taxonomy.subject_area_of(s.lt), Ok(Some(s.math)));
        assert_eq!(s.taxonomy.subject_area_of(s.school), Ok(None));
    }

    #[test]
    fn subject_area_children_exclude_subdiscipline_competencies() {
        let s = sample();
        let general = s
            .taxonomy
            .child_ids(s.math, NodeKind::CompetencyArea)
            .expect("children should resolve");
        assert_eq!(general, vec![s.algebra, s.geometry]);
        let scoped = s
            .taxonomy
            .child_ids(s.sda, NodeKind::CompetencyArea)
            .expect("children should resolve");
        assert_eq!(scoped, vec![s.sda_ca]);
    }

    #[test]
    fn descendants_visit_every_edge_once() {
        let s = sample();
        let mut all = s.taxonomy.descendants(s.math).expect("descendants should resolve");
        let count = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), count);
        assert!(all.contains(&s.sda_ca));
        assert!(all.contains(&s.lt));
        assert!(all.contains(&s.level));
        // everything but the school and the two subject areas
        assert_eq!(count, s.taxonomy.len() - 3);
    }

    #[test]
    fn descendants_ignore_missing_order_entries() {
        let s = sample();
        let mut parts = s.taxonomy.to_parts();
        parts.orders.clear();
        let mut bare = Taxonomy::from_parts(parts);
        assert_eq!(
            bare.descendants(s.math).map(|ids| ids.len()),
            s.taxonomy.descendants(s.math).map(|ids| ids.len())
        );

        for id in bare.descendants(s.math).expect("descendants should resolve") {
            bare.node_mut(id).expect("node exists").public = true;
        }
        bare.cascade_private_down(s.math).expect("cascade should work");
        assert!(bare.nodes().all(|node| !node.public));
    }

    #[test]
    fn unknown_ids_fail_with_not_found() {
        let s = sample();
        let err = s.taxonomy.node(NodeId(999)).expect_err("missing id must error");
        assert_eq!(err.class(), "not_found");
        let err = s
            .taxonomy
            .node_of_kind(NodeKind::School, s.math)
            .expect_err("wrong kind must error");
        assert!(matches!(err, TaxonomyError::NotFound { what: "school", .. }));
    }

    #[test]
    fn create_rejects_invalid_parent_and_fields() {
        let mut s = sample();
        let err = s
            .taxonomy
            .insert_child(s.school, NodeKind::CompetencyArea, NodeFields::labeled("x"))
            .expect_err("competency area cannot hang off a school");
        assert!(matches!(err, TaxonomyError::InvalidParent(_)));

        let mut fields = NodeFields::labeled("x");
        fields.student_friendly = Some("kid words".to_string());
        let err = s
            .taxonomy
            .insert_child(s.math, NodeKind::SubdisciplineArea, fields)
            .expect_err("student_friendly is leaf-only");
        assert!(matches!(err, TaxonomyError::FieldNotSupported { .. }));

        let err = s
            .taxonomy
            .insert_child(s.algebra, NodeKind::Level, NodeFields::labeled("x"))
            .expect_err("level needs a type");
        assert!(matches!(
            err,
            TaxonomyError::MissingField {
                field: "level_type",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_level_type_is_a_uniqueness_violation() {
        let mut s = sample();
        let err = s
            .taxonomy
            .insert_child(
                s.algebra,
                NodeKind::Level,
                NodeFields::labeled("again").with_level_type(LevelType::Apprentice),
            )
            .expect_err("second apprentice level must fail");
        assert!(matches!(err, TaxonomyError::UniquenessViolation { .. }));

        let other = s
            .taxonomy
            .insert_child(
                s.algebra,
                NodeKind::Level,
                NodeFields::labeled("next").with_level_type(LevelType::Technician),
            )
            .expect("technician level should be created");
        let err = s
            .taxonomy
            .apply_fields(other, NodeFields::default().with_level_type(LevelType::Apprentice))
            .expect_err("retyping onto an existing level must fail");
        assert!(matches!(err, TaxonomyError::UniquenessViolation { .. }));
    }

    #[test]
    fn field_updates_leave_order_and_visibility_alone() {
        let mut s = sample();
        s.taxonomy.cascade_public_up(s.geometry).expect("publish should work");
        let before = s
            .taxonomy
            .get_order(s.math, NodeKind::CompetencyArea)
            .expect("order should resolve");

        let changed = s
            .taxonomy
            .apply_fields(s.geometry, NodeFields::labeled("Geometry & Proof"))
            .expect("update should work");
        assert!(changed);
        assert_eq!(
            s.taxonomy.get_order(s.math, NodeKind::CompetencyArea),
            Ok(before)
        );
        assert!(s.taxonomy.node(s.geometry).expect("node exists").public);
    }

    #[test]
    fn transact_rolls_back_on_error() {
        let mut s = sample();
        let before = s.taxonomy.clone();
        let result: Result<(), TaxonomyError> = s.taxonomy.transact(|t| {
            t.set_private(s.math)?;
            Err(TaxonomyError::Unauthenticated)
        });
        assert!(result.is_err());
        assert_eq!(s.taxonomy, before);
    }

    #[test]
    fn parts_roundtrip_preserves_state() {
        let s = sample();
        let rebuilt = Taxonomy::from_parts(s.taxonomy.to_parts());
        assert_eq!(rebuilt, s.taxonomy);
    }
}
