//! # opencomp-store
//!
//! Persistence for the competency taxonomy.
//!
//! This crate provides:
//! - `Record`, the tagged line shapes of the store file
//! - JSONL read/write with atomic replace
//! - `TaxonomyStore` (canonical in-memory state, order repair on load)
//! - lock-scoped mutation with optional snapshot checks
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per record)
//!     ↕  hydrate / flush
//! TaxonomyStore (Taxonomy + load-time repairs)
//! ```

pub mod atomic_store;
pub mod jsonl;
pub mod memory;
pub mod record;

pub use atomic_store::{AtomicStoreMutationError, mutate_taxonomy_jsonl, store_lock_path};
pub use jsonl::{JsonlError, decode_records, read_records_from_path, write_records_to_path};
pub use memory::{SNAPSHOT_REF_PREFIX, StoreError, TaxonomyStore};
pub use record::Record;
