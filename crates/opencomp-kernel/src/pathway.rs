//! Pathways: named, cross-cutting selections of nodes within one school.
//!
//! A pathway is not part of the hierarchy. What it may select narrows as
//! the selection grows: subdiscipline areas come from selected subject
//! areas, competency areas from selected subject or subdiscipline areas,
//! and so on down to learning targets.

use crate::error::TaxonomyError;
use crate::node::{Actor, Node, NodeId, NodeKind};
use crate::tree::Taxonomy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Pathway identifier, allocated from the taxonomy's id counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathwayId(pub u64);

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds a pathway can select, in selection-dependency order.
pub const SELECTABLE_KINDS: [NodeKind; 5] = [
    NodeKind::SubjectArea,
    NodeKind::SubdisciplineArea,
    NodeKind::CompetencyArea,
    NodeKind::EssentialUnderstanding,
    NodeKind::LearningTarget,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathway {
    pub id: PathwayId,
    pub name: String,
    pub school: NodeId,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subject_areas: BTreeSet<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subdiscipline_areas: BTreeSet<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub competency_areas: BTreeSet<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub essential_understandings: BTreeSet<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub learning_targets: BTreeSet<NodeId>,
}

impl Pathway {
    pub fn new(id: PathwayId, name: impl Into<String>, school: NodeId) -> Self {
        Self {
            id,
            name: name.into(),
            school,
            subject_areas: BTreeSet::new(),
            subdiscipline_areas: BTreeSet::new(),
            competency_areas: BTreeSet::new(),
            essential_understandings: BTreeSet::new(),
            learning_targets: BTreeSet::new(),
        }
    }

    /// The selection set for `kind`, if the kind is selectable.
    pub fn selection(&self, kind: NodeKind) -> Option<&BTreeSet<NodeId>> {
        match kind {
            NodeKind::SubjectArea => Some(&self.subject_areas),
            NodeKind::SubdisciplineArea => Some(&self.subdiscipline_areas),
            NodeKind::CompetencyArea => Some(&self.competency_areas),
            NodeKind::EssentialUnderstanding => Some(&self.essential_understandings),
            NodeKind::LearningTarget => Some(&self.learning_targets),
            NodeKind::School | NodeKind::Level => None,
        }
    }

    fn selection_mut(&mut self, kind: NodeKind) -> Option<&mut BTreeSet<NodeId>> {
        match kind {
            NodeKind::SubjectArea => Some(&mut self.subject_areas),
            NodeKind::SubdisciplineArea => Some(&mut self.subdiscipline_areas),
            NodeKind::CompetencyArea => Some(&mut self.competency_areas),
            NodeKind::EssentialUnderstanding => Some(&mut self.essential_understandings),
            NodeKind::LearningTarget => Some(&mut self.learning_targets),
            NodeKind::School | NodeKind::Level => None,
        }
    }

    pub fn contains(&self, kind: NodeKind, id: NodeId) -> bool {
        self.selection(kind).is_some_and(|set| set.contains(&id))
    }

    /// Number of selected nodes across all kinds.
    pub fn selected_count(&self) -> usize {
        SELECTABLE_KINDS
            .iter()
            .filter_map(|kind| self.selection(*kind))
            .map(BTreeSet::len)
            .sum()
    }
}

impl Taxonomy {
    pub fn pathway(&self, id: PathwayId) -> Result<&Pathway, TaxonomyError> {
        self.pathways.get(&id).ok_or_else(|| TaxonomyError::NotFound {
            what: "pathway",
            id: id.to_string(),
        })
    }

    fn pathway_mut(&mut self, id: PathwayId) -> Result<&mut Pathway, TaxonomyError> {
        self.pathways
            .get_mut(&id)
            .ok_or_else(|| TaxonomyError::NotFound {
                what: "pathway",
                id: id.to_string(),
            })
    }

    /// Pathways of one school, in id order.
    pub fn pathways_of(&self, school: NodeId) -> impl Iterator<Item = &Pathway> {
        self.pathways
            .values()
            .filter(move |pathway| pathway.school == school)
    }

    /// Iterate every pathway in id order.
    pub fn pathways(&self) -> impl Iterator<Item = &Pathway> {
        self.pathways.values()
    }

    /// Nodes of `kind` the pathway may currently select, in display order.
    pub fn pathway_candidates(
        &self,
        id: PathwayId,
        kind: NodeKind,
    ) -> Result<Vec<NodeId>, TaxonomyError> {
        let pathway = self.pathway(id)?;
        self.candidates_for(pathway, kind)
    }

    fn candidates_for(&self, pathway: &Pathway, kind: NodeKind) -> Result<Vec<NodeId>, TaxonomyError> {
        let selected_of = |kind: NodeKind| -> Result<Vec<NodeId>, TaxonomyError> {
            Ok(self
                .candidates_for(pathway, kind)?
                .into_iter()
                .filter(|id| pathway.contains(kind, *id))
                .collect())
        };

        let mut out = Vec::new();
        match kind {
            NodeKind::SubjectArea => {
                out = self.child_ids(pathway.school, NodeKind::SubjectArea)?;
            }
            NodeKind::SubdisciplineArea => {
                for sa in selected_of(NodeKind::SubjectArea)? {
                    out.extend(self.child_ids(sa, NodeKind::SubdisciplineArea)?);
                }
            }
            NodeKind::CompetencyArea => {
                for sa in selected_of(NodeKind::SubjectArea)? {
                    out.extend(self.child_ids(sa, NodeKind::CompetencyArea)?);
                }
                for sda in selected_of(NodeKind::SubdisciplineArea)? {
                    out.extend(self.child_ids(sda, NodeKind::CompetencyArea)?);
                }
            }
            NodeKind::EssentialUnderstanding => {
                for ca in selected_of(NodeKind::CompetencyArea)? {
                    out.extend(self.child_ids(ca, NodeKind::EssentialUnderstanding)?);
                }
            }
            NodeKind::LearningTarget => {
                for eu in selected_of(NodeKind::EssentialUnderstanding)? {
                    out.extend(self.child_ids(eu, NodeKind::LearningTarget)?);
                }
            }
            NodeKind::School | NodeKind::Level => {}
        }
        Ok(out)
    }

    /// Selected nodes the viewer may see, grouped by kind in display order.
    pub fn pathway_nodes(&self, id: PathwayId, viewer: &Actor) -> Result<Vec<&Node>, TaxonomyError> {
        let pathway = self.pathway(id)?;
        let mut out = Vec::new();
        for kind in SELECTABLE_KINDS {
            for candidate in self.candidates_for(pathway, kind)? {
                if pathway.contains(kind, candidate)
                    && self.is_effectively_visible(candidate, viewer)?
                {
                    out.push(self.node(candidate)?);
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn insert_pathway(
        &mut self,
        school: NodeId,
        name: impl Into<String>,
    ) -> Result<PathwayId, TaxonomyError> {
        self.node_of_kind(NodeKind::School, school)?;
        let id = PathwayId(self.allocate_id());
        self.pathways.insert(id, Pathway::new(id, name, school));
        Ok(id)
    }

    pub(crate) fn select_in_pathway(
        &mut self,
        id: PathwayId,
        node: NodeId,
    ) -> Result<bool, TaxonomyError> {
        let kind = self.node(node)?.kind();
        let pathway = self.pathway(id)?;
        if pathway.selection(kind).is_none() {
            return Err(TaxonomyError::InvalidSelection {
                pathway: id,
                node,
                reason: format!("{kind} nodes cannot be selected"),
            });
        }
        if !self.candidates_for(pathway, kind)?.contains(&node) {
            return Err(TaxonomyError::InvalidSelection {
                pathway: id,
                node,
                reason: format!("not a candidate {kind} for the current selection"),
            });
        }
        let inserted = self
            .pathway_mut(id)?
            .selection_mut(kind)
            .is_some_and(|set| set.insert(node));
        Ok(inserted)
    }

    /// Remove a node from the selection, then drop any selections that are
    /// no longer candidates because of it.
    pub(crate) fn deselect_in_pathway(
        &mut self,
        id: PathwayId,
        node: NodeId,
    ) -> Result<bool, TaxonomyError> {
        let kind = self.node(node)?.kind();
        let removed = self
            .pathway_mut(id)?
            .selection_mut(kind)
            .is_some_and(|set| set.remove(&node));
        if !removed {
            return Ok(false);
        }

        for dependent in SELECTABLE_KINDS {
            let pathway = self.pathway(id)?;
            let candidates: BTreeSet<NodeId> =
                self.candidates_for(pathway, dependent)?.into_iter().collect();
            if let Some(set) = self.pathway_mut(id)?.selection_mut(dependent) {
                set.retain(|selected| candidates.contains(selected));
            }
        }
        Ok(true)
    }
}
