//! # OpenComp Kernel
//!
//! A competency taxonomy: schools own subject areas, which break down into
//! subdiscipline areas, competency areas, levels, essential understandings,
//! and learning targets.
//!
//! This crate is **storage-agnostic**: it operates on an in-memory
//! `Taxonomy` and leaves persistence to `opencomp-store`. Every mutation
//! goes through [`gate`], which takes the acting user explicitly.
//!
//! ## Architecture
//!
//! ```text
//! Node / NodeKind       ← Entities and the static parent/child edges
//!     │
//! Taxonomy (tree)       ← Canonical state, traversal, transactions
//!     │
//! ├── order             ← Explicit sibling sequences, scoped moves
//! ├── visibility        ← public flag, cascade up / cascade down
//! ├── permission        ← School and subject-area editor grants
//! ├── pathway           ← Cross-cutting node selections
//! └── summary           ← Subject-area summary document
//!     │
//! gate                  ← Permission-checked entry points
//! ```

pub mod error;
pub mod gate;
pub mod node;
pub mod order;
pub mod pathway;
pub mod permission;
pub mod summary;
pub mod tree;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use error::TaxonomyError;
pub use node::{Actor, ActorId, LevelType, Node, NodeBody, NodeFields, NodeId, NodeKind};
pub use order::{Direction, OrderDrift};
pub use pathway::{Pathway, PathwayId};
pub use permission::UserProfile;
pub use summary::{SubjectAreaSummary, SummaryRow};
pub use tree::{Taxonomy, TaxonomyParts};
pub use visibility::{VisibilityChange, VisibilityMode};
