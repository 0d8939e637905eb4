//! Editor grants and the `can_edit` decision.
//!
//! Rights are granted at two levels: a whole school, or one subject area
//! (and everything beneath it). A school's owner is always an editor of it.

use crate::error::TaxonomyError;
use crate::node::{Actor, ActorId, NodeBody, NodeId, NodeKind};
use crate::tree::Taxonomy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Grants held by one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub actor: ActorId,
    /// Schools the actor may edit in full.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub schools: BTreeSet<NodeId>,
    /// Individual subject areas the actor may edit.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subject_areas: BTreeSet<NodeId>,
}

impl UserProfile {
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            schools: BTreeSet::new(),
            subject_areas: BTreeSet::new(),
        }
    }
}

impl Taxonomy {
    /// Lookup the grant profile of an actor.
    pub fn profile(&self, actor: &ActorId) -> Option<&UserProfile> {
        self.profiles.get(actor)
    }

    /// Iterate profiles in actor order.
    pub fn profiles(&self) -> impl Iterator<Item = &UserProfile> {
        self.profiles.values()
    }

    fn profile_entry(&mut self, actor: &ActorId) -> &mut UserProfile {
        self.profiles
            .entry(actor.clone())
            .or_insert_with(|| UserProfile::new(actor.clone()))
    }

    fn owns_school(&self, actor: &ActorId, school: NodeId) -> bool {
        matches!(
            self.nodes.get(&school).map(|node| &node.body),
            Some(NodeBody::School { owner, .. }) if owner == actor
        )
    }

    /// Whether `actor` may edit within `school`, optionally narrowed to one
    /// subject area.
    ///
    /// True when the actor holds (or owns) the school; otherwise true only
    /// when `subject_area` is given and granted to the actor.
    pub fn can_edit(&self, actor: &Actor, school: NodeId, subject_area: Option<NodeId>) -> bool {
        let Some(actor) = actor.id() else {
            return false;
        };
        if self.owns_school(actor, school) {
            return true;
        }
        let Some(profile) = self.profiles.get(actor) else {
            return false;
        };
        if profile.schools.contains(&school) {
            return true;
        }
        subject_area.is_some_and(|sa| profile.subject_areas.contains(&sa))
    }

    /// `can_edit` for the school and subject area a node sits under.
    pub fn can_edit_node(&self, actor: &Actor, id: NodeId) -> Result<bool, TaxonomyError> {
        let school = self.school_of(id)?;
        let subject_area = self.subject_area_of(id)?;
        Ok(self.can_edit(actor, school, subject_area))
    }

    /// Fail with `PermissionDenied` unless `actor` may edit the node.
    pub fn require_edit(&self, actor: &Actor, id: NodeId) -> Result<(), TaxonomyError> {
        if actor.id().is_none() {
            return Err(TaxonomyError::Unauthenticated);
        }
        if self.can_edit_node(actor, id)? {
            return Ok(());
        }
        Err(TaxonomyError::PermissionDenied {
            actor: actor.to_string(),
            target: self.node(id)?.reference(),
        })
    }

    /// Fail with `PermissionDenied` unless `actor` may edit the whole school.
    pub fn require_school_edit(&self, actor: &Actor, school: NodeId) -> Result<(), TaxonomyError> {
        let school_node = self.node_of_kind(NodeKind::School, school)?;
        if actor.id().is_none() {
            return Err(TaxonomyError::Unauthenticated);
        }
        if self.can_edit(actor, school, None) {
            return Ok(());
        }
        Err(TaxonomyError::PermissionDenied {
            actor: actor.to_string(),
            target: school_node.reference(),
        })
    }

    pub(crate) fn grant_school_raw(&mut self, grantee: &ActorId, school: NodeId) -> Result<bool, TaxonomyError> {
        self.node_of_kind(NodeKind::School, school)?;
        Ok(self.profile_entry(grantee).schools.insert(school))
    }

    pub(crate) fn grant_subject_area_raw(
        &mut self,
        grantee: &ActorId,
        subject_area: NodeId,
    ) -> Result<bool, TaxonomyError> {
        self.node_of_kind(NodeKind::SubjectArea, subject_area)?;
        Ok(self.profile_entry(grantee).subject_areas.insert(subject_area))
    }
}
