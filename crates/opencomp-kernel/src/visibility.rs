//! Visibility engine: the `public` flag and its cascades.
//!
//! Per node the state is `private` or `public`:
//! - `private → public` requires the parent chain to be public
//!   (`set_public`), or forces it public (`cascade_public_up`)
//! - `public → private` is unconditional and cascades to every descendant
//!
//! A school is transparent: it never blocks publishing beneath it and is
//! always listed to every viewer.

use crate::error::TaxonomyError;
use crate::node::{Actor, Node, NodeBody, NodeId, NodeKind};
use crate::tree::Taxonomy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested visibility change for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    /// Publish only if the parent chain is already public.
    Public,
    /// Publish, forcing every ancestor public first.
    CascadePublic,
    /// Make private, together with every descendant.
    Private,
}

impl VisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityMode::Public => "public",
            VisibilityMode::CascadePublic => "cascade_public",
            VisibilityMode::Private => "private",
        }
    }
}

impl fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "public" => Ok(VisibilityMode::Public),
            "cascade_public" => Ok(VisibilityMode::CascadePublic),
            "private" => Ok(VisibilityMode::Private),
            _ => Err(format!(
                "unknown visibility mode `{s}` (expected public, cascade_public, or private)"
            )),
        }
    }
}

/// One entry of a batch visibility edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityChange {
    pub node: NodeId,
    pub mode: VisibilityMode,
}

impl VisibilityChange {
    pub fn new(node: NodeId, mode: VisibilityMode) -> Self {
        Self { node, mode }
    }
}

impl Taxonomy {
    fn is_public(&self, id: NodeId) -> Result<bool, TaxonomyError> {
        Ok(self.node(id)?.public)
    }

    /// Whether the immediate parent(s) allow this node to be published.
    ///
    /// A competency area checks both its subject area and, when filed under
    /// one, its subdiscipline area.
    pub fn is_parent_public(&self, id: NodeId) -> Result<bool, TaxonomyError> {
        match &self.node(id)?.body {
            NodeBody::School { .. } | NodeBody::SubjectArea { .. } => Ok(true),
            NodeBody::SubdisciplineArea { subject_area } => self.is_public(*subject_area),
            NodeBody::CompetencyArea {
                subject_area,
                subdiscipline_area,
            } => {
                let sda_public = match subdiscipline_area {
                    Some(sda) => self.is_public(*sda)?,
                    None => true,
                };
                Ok(sda_public && self.is_public(*subject_area)?)
            }
            NodeBody::Level {
                competency_area, ..
            }
            | NodeBody::EssentialUnderstanding { competency_area } => {
                self.is_public(*competency_area)
            }
            NodeBody::LearningTarget {
                essential_understanding,
            } => self.is_public(*essential_understanding),
        }
    }

    /// Whether an anonymous viewer sees the node: it and every ancestor
    /// below the school are public.
    pub fn is_publicly_visible(&self, id: NodeId) -> Result<bool, TaxonomyError> {
        let node = self.node(id)?;
        if node.kind() == NodeKind::School {
            return Ok(true);
        }
        if !node.public {
            return Ok(false);
        }
        for ancestor in self.ancestors(id)? {
            let ancestor = self.node(ancestor)?;
            if ancestor.kind() != NodeKind::School && !ancestor.public {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether `viewer` may see the node. Editors with rights over the
    /// node's school or subject area see everything.
    pub fn is_effectively_visible(&self, id: NodeId, viewer: &Actor) -> Result<bool, TaxonomyError> {
        if self.can_edit_node(viewer, id)? {
            return Ok(true);
        }
        self.is_publicly_visible(id)
    }

    /// Children of `kind` under `parent` that `viewer` may see, in order.
    pub fn visible_children(
        &self,
        parent: NodeId,
        kind: NodeKind,
        viewer: &Actor,
    ) -> Result<Vec<&Node>, TaxonomyError> {
        let mut visible = Vec::new();
        for child in self.children(parent, kind)? {
            if self.is_effectively_visible(child.id, viewer)? {
                visible.push(child);
            }
        }
        Ok(visible)
    }

    fn mark(&mut self, id: NodeId, public: bool, changed: &mut Vec<NodeId>) -> Result<(), TaxonomyError> {
        let node = self.node_mut(id)?;
        if node.public != public {
            node.public = public;
            node.touch_updated_at();
            changed.push(id);
        }
        Ok(())
    }

    /// Publish one node. Fails with `ParentNotPublic`, leaving the node
    /// untouched, unless `is_parent_public` holds. Returns whether the flag
    /// changed.
    pub fn set_public(&mut self, id: NodeId) -> Result<bool, TaxonomyError> {
        if !self.is_parent_public(id)? {
            let kind = self.node(id)?.kind();
            return Err(TaxonomyError::ParentNotPublic { id, kind });
        }
        let mut changed = Vec::new();
        self.mark(id, true, &mut changed)?;
        Ok(!changed.is_empty())
    }

    /// Force every strict ancestor public, then publish the node.
    /// Returns the ids whose flag changed, root-most first.
    pub fn cascade_public_up(&mut self, id: NodeId) -> Result<Vec<NodeId>, TaxonomyError> {
        self.cascade_public_up_to(id, true)
    }

    /// As `cascade_public_up`, leaving the school flag alone unless
    /// `reach_school` is set. The school is transparent to visibility, so
    /// the node ends up publicly visible either way.
    pub(crate) fn cascade_public_up_to(
        &mut self,
        id: NodeId,
        reach_school: bool,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        let mut chain = self.ancestors(id)?;
        chain.reverse();
        chain.push(id);

        let mut changed = Vec::new();
        for target in chain {
            if !reach_school && self.node(target)?.kind() == NodeKind::School {
                continue;
            }
            self.mark(target, true, &mut changed)?;
        }
        if !changed.is_empty() {
            tracing::debug!(node = %id, changed = changed.len(), "public cascaded up");
        }
        Ok(changed)
    }

    /// Make the node and every descendant private.
    /// Returns the ids whose flag changed, in pre-order.
    pub fn cascade_private_down(&mut self, id: NodeId) -> Result<Vec<NodeId>, TaxonomyError> {
        let mut targets = vec![id];
        targets.extend(self.descendants(id)?);

        let mut changed = Vec::new();
        for target in targets {
            self.mark(target, false, &mut changed)?;
        }
        if !changed.is_empty() {
            tracing::debug!(node = %id, changed = changed.len(), "private cascaded down");
        }
        Ok(changed)
    }

    /// Alias of `cascade_private_down`: privacy always reaches descendants.
    pub fn set_private(&mut self, id: NodeId) -> Result<Vec<NodeId>, TaxonomyError> {
        self.cascade_private_down(id)
    }

    /// Apply one visibility change. Returns the ids whose flag changed.
    pub fn apply_visibility(
        &mut self,
        id: NodeId,
        mode: VisibilityMode,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        self.apply_visibility_to(id, mode, true)
    }

    pub(crate) fn apply_visibility_to(
        &mut self,
        id: NodeId,
        mode: VisibilityMode,
        reach_school: bool,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        match mode {
            VisibilityMode::Public => Ok(if self.set_public(id)? {
                vec![id]
            } else {
                Vec::new()
            }),
            VisibilityMode::CascadePublic => self.cascade_public_up_to(id, reach_school),
            VisibilityMode::Private => self.cascade_private_down(id),
        }
    }

    /// Apply several visibility changes as one unit.
    ///
    /// Cascades up run first since they never fail on a private parent.
    /// Plain publishes follow, shallowest first, so a parent and child
    /// published in the same batch both succeed. Privacy cascades run last,
    /// so a node both published and reached by one ends private. Any
    /// failure rolls the whole batch back.
    pub fn apply_visibility_batch(
        &mut self,
        changes: &[VisibilityChange],
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        self.apply_visibility_batch_to(changes, |_| true)
    }

    /// Batch form of `apply_visibility_to`; `reach_school` decides per
    /// target whether a cascade up may touch its school.
    pub(crate) fn apply_visibility_batch_to(
        &mut self,
        changes: &[VisibilityChange],
        reach_school: impl Fn(NodeId) -> bool,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        let mut cascades = Vec::new();
        let mut publishes = Vec::new();
        let mut downward = Vec::new();
        for change in changes {
            match change.mode {
                VisibilityMode::CascadePublic => cascades.push(*change),
                VisibilityMode::Public => publishes.push((self.depth(change.node)?, *change)),
                VisibilityMode::Private => downward.push(*change),
            }
        }
        publishes.sort_by_key(|(depth, _)| *depth);

        let ordered: Vec<VisibilityChange> = cascades
            .into_iter()
            .chain(publishes.into_iter().map(|(_, change)| change))
            .chain(downward)
            .collect();
        self.transact(|taxonomy| {
            let mut changed = Vec::new();
            for change in &ordered {
                changed.extend(taxonomy.apply_visibility_to(
                    change.node,
                    change.mode,
                    reach_school(change.node),
                )?);
            }
            Ok(changed)
        })
    }
}
