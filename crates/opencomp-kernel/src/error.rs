//! Error types for taxonomy operations.

use crate::node::{NodeId, NodeKind};
use crate::pathway::PathwayId;

/// Errors arising from taxonomy reads, edits, and permission checks.
///
/// Every variant is reported to the caller as-is; nothing in the kernel
/// retries. A failed operation leaves the taxonomy exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    /// A node, pathway, or profile id does not resolve.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The actor lacks an editor grant covering the target.
    #[error("actor `{actor}` may not edit {target}")]
    PermissionDenied { actor: String, target: String },

    /// The operation needs an authenticated actor.
    #[error("an authenticated actor is required")]
    Unauthenticated,

    /// A proposed order list is not a permutation of the live children.
    #[error("invalid {kind} order under node {parent}: {reason}")]
    InvalidOrder {
        parent: NodeId,
        kind: NodeKind,
        reason: String,
    },

    /// Publishing was refused because the ancestor chain is not public.
    #[error("cannot publish {kind} {id}: parent is not public")]
    ParentNotPublic { id: NodeId, kind: NodeKind },

    /// A uniqueness constraint (one Level per competency area and type) was hit.
    #[error("uniqueness violation: {description}")]
    UniquenessViolation { description: String },

    /// The child kind cannot live under the given parent.
    #[error("invalid parent: {0}")]
    InvalidParent(String),

    /// A required field was not supplied on create.
    #[error("{kind} requires field `{field}`")]
    MissingField { kind: NodeKind, field: &'static str },

    /// The field does not exist on this kind of node.
    #[error("{kind} does not support field `{field}`")]
    FieldNotSupported { kind: NodeKind, field: &'static str },

    /// The node is not a candidate for the pathway selection.
    #[error("pathway {pathway} cannot select node {node}: {reason}")]
    InvalidSelection {
        pathway: PathwayId,
        node: NodeId,
        reason: String,
    },
}

impl TaxonomyError {
    pub(crate) fn node_not_found(id: NodeId) -> Self {
        Self::NotFound {
            what: "node",
            id: id.to_string(),
        }
    }

    pub(crate) fn kind_not_found(kind: NodeKind, id: NodeId) -> Self {
        Self::NotFound {
            what: kind.as_str(),
            id: id.to_string(),
        }
    }

    /// Stable failure class for machine-readable output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidOrder { .. } => "invalid_order",
            Self::ParentNotPublic { .. } => "parent_not_public",
            Self::UniquenessViolation { .. } => "uniqueness_violation",
            Self::InvalidParent(_) => "invalid_parent",
            Self::MissingField { .. } => "missing_field",
            Self::FieldNotSupported { .. } => "field_not_supported",
            Self::InvalidSelection { .. } => "invalid_selection",
        }
    }

    /// Whether the caller can simply retry with different input.
    ///
    /// Not-found and permission failures surface as denial pages; the rest
    /// are rejected edits with prior state retained.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound { .. } | Self::PermissionDenied { .. } | Self::Unauthenticated
        )
    }
}
