//! The edit gate: every mutation entry point, with the acting user passed
//! explicitly.
//!
//! Each operation checks permission before touching state, then runs the
//! edit inside `Taxonomy::transact` so a failure leaves nothing behind.
//! Reads are plain lookups plus the visibility filter.

use crate::error::TaxonomyError;
use crate::node::{Actor, ActorId, Node, NodeFields, NodeId, NodeKind};
use crate::order::Direction;
use crate::pathway::PathwayId;
use crate::tree::Taxonomy;
use crate::visibility::{VisibilityChange, VisibilityMode};

fn authenticated(actor: &Actor) -> Result<&ActorId, TaxonomyError> {
    actor.id().ok_or(TaxonomyError::Unauthenticated)
}

/// Create a school owned by `actor`. Any authenticated actor may do this.
pub fn create_school(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    name: impl Into<String>,
) -> Result<NodeId, TaxonomyError> {
    let owner = authenticated(actor)?.clone();
    let name = name.into();
    taxonomy.transact(|t| {
        let id = t.insert_school(name, owner.clone());
        t.grant_school_raw(&owner, id)?;
        tracing::info!(school = %id, owner = %owner, "school created");
        Ok(id)
    })
}

/// Create a node of `kind` under `parent`.
pub fn create_node(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    parent: NodeId,
    kind: NodeKind,
    fields: NodeFields,
) -> Result<NodeId, TaxonomyError> {
    taxonomy.require_edit(actor, parent)?;
    taxonomy.transact(|t| t.insert_child(parent, kind, fields))
}

/// Update the editable fields of a node. Visibility and order are kept.
pub fn update_node(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    id: NodeId,
    fields: NodeFields,
) -> Result<bool, TaxonomyError> {
    taxonomy.require_edit(actor, id)?;
    taxonomy.transact(|t| t.apply_fields(id, fields))
}

pub fn update_school_aliases(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    school: NodeId,
    alias_ca: Option<String>,
    alias_eu: Option<String>,
) -> Result<bool, TaxonomyError> {
    taxonomy.require_school_edit(actor, school)?;
    taxonomy.transact(|t| t.apply_school_aliases(school, alias_ca, alias_eu))
}

/// Change one node's visibility. Returns the ids whose flag changed.
pub fn set_visibility(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    id: NodeId,
    mode: VisibilityMode,
) -> Result<Vec<NodeId>, TaxonomyError> {
    taxonomy.require_edit(actor, id)?;
    let reach_school = holds_school_of(taxonomy, actor, id)?;
    taxonomy.transact(|t| t.apply_visibility_to(id, mode, reach_school))
}

/// Whether `actor` may edit the school above `id`. A cascade up only
/// touches the school flag for such actors.
fn holds_school_of(taxonomy: &Taxonomy, actor: &Actor, id: NodeId) -> Result<bool, TaxonomyError> {
    let school = taxonomy.school_of(id)?;
    Ok(taxonomy.can_edit(actor, school, None))
}

/// Change several nodes' visibility as one unit. Every target is checked
/// for permission before anything is applied.
pub fn set_visibility_batch(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    changes: &[VisibilityChange],
) -> Result<Vec<NodeId>, TaxonomyError> {
    let mut reach = std::collections::BTreeMap::new();
    for change in changes {
        taxonomy.require_edit(actor, change.node)?;
        reach.insert(change.node, holds_school_of(taxonomy, actor, change.node)?);
    }
    taxonomy.apply_visibility_batch_to(changes, |id| reach.get(&id).copied().unwrap_or(false))
}

pub fn set_order(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    parent: NodeId,
    kind: NodeKind,
    sequence: Vec<NodeId>,
) -> Result<bool, TaxonomyError> {
    taxonomy.require_edit(actor, parent)?;
    taxonomy.transact(|t| t.set_order(parent, kind, sequence))
}

pub fn move_child(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    parent: NodeId,
    child: NodeId,
    direction: Direction,
) -> Result<bool, TaxonomyError> {
    taxonomy.require_edit(actor, parent)?;
    taxonomy.transact(|t| t.move_child(parent, child, direction))
}

/// Grant `grantee` editor rights over a whole school. The granter must
/// hold school-level rights themselves.
pub fn grant_school(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    grantee: &ActorId,
    school: NodeId,
) -> Result<bool, TaxonomyError> {
    taxonomy.require_school_edit(actor, school)?;
    let changed = taxonomy.grant_school_raw(grantee, school)?;
    if changed {
        tracing::info!(%grantee, %school, "school grant added");
    }
    Ok(changed)
}

/// Grant `grantee` editor rights over one subject area.
pub fn grant_subject_area(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    grantee: &ActorId,
    subject_area: NodeId,
) -> Result<bool, TaxonomyError> {
    taxonomy.node_of_kind(NodeKind::SubjectArea, subject_area)?;
    let school = taxonomy.school_of(subject_area)?;
    taxonomy.require_school_edit(actor, school)?;
    let changed = taxonomy.grant_subject_area_raw(grantee, subject_area)?;
    if changed {
        tracing::info!(%grantee, %subject_area, "subject area grant added");
    }
    Ok(changed)
}

pub fn create_pathway(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    school: NodeId,
    name: impl Into<String>,
) -> Result<PathwayId, TaxonomyError> {
    taxonomy.require_school_edit(actor, school)?;
    let name = name.into();
    taxonomy.transact(|t| t.insert_pathway(school, name))
}

pub fn select_pathway_node(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    pathway: PathwayId,
    node: NodeId,
) -> Result<bool, TaxonomyError> {
    let school = taxonomy.pathway(pathway)?.school;
    taxonomy.require_school_edit(actor, school)?;
    taxonomy.transact(|t| t.select_in_pathway(pathway, node))
}

pub fn deselect_pathway_node(
    taxonomy: &mut Taxonomy,
    actor: &Actor,
    pathway: PathwayId,
    node: NodeId,
) -> Result<bool, TaxonomyError> {
    let school = taxonomy.pathway(pathway)?.school;
    taxonomy.require_school_edit(actor, school)?;
    taxonomy.transact(|t| t.deselect_in_pathway(pathway, node))
}

/// Lookup a node, requiring its kind.
pub fn get_node(taxonomy: &Taxonomy, kind: NodeKind, id: NodeId) -> Result<&Node, TaxonomyError> {
    taxonomy.node_of_kind(kind, id)
}

/// Lookup a node as `viewer` sees it. Hidden nodes report as not found.
pub fn view_node<'a>(
    taxonomy: &'a Taxonomy,
    id: NodeId,
    viewer: &Actor,
) -> Result<&'a Node, TaxonomyError> {
    let node = taxonomy.node(id)?;
    if !taxonomy.is_effectively_visible(id, viewer)? {
        return Err(TaxonomyError::node_not_found(id));
    }
    Ok(node)
}

pub fn list_children<'a>(
    taxonomy: &'a Taxonomy,
    parent: NodeId,
    kind: NodeKind,
    viewer: &Actor,
) -> Result<Vec<&'a Node>, TaxonomyError> {
    taxonomy.visible_children(parent, kind, viewer)
}

pub fn get_order(
    taxonomy: &Taxonomy,
    parent: NodeId,
    kind: NodeKind,
) -> Result<Vec<NodeId>, TaxonomyError> {
    taxonomy.get_order(parent, kind)
}

pub fn list_schools(taxonomy: &Taxonomy) -> Vec<&Node> {
    taxonomy.schools().collect()
}

pub fn can_edit(
    taxonomy: &Taxonomy,
    actor: &Actor,
    school: NodeId,
    subject_area: Option<NodeId>,
) -> bool {
    taxonomy.can_edit(actor, school, subject_area)
}
