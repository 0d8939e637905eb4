//! Canonical in-memory taxonomy state, hydrated from and flushed to JSONL.
//!
//! This is the memory boundary for `opencomp-store`:
//! - load/store JSONL
//! - repair drifted order lists on load
//! - content-address the persisted bytes with a snapshot ref

use crate::jsonl::{JsonlError, encode_records, read_records_from_path, write_records_to_path};
use crate::record::{Record, parts_from_records, records_from_parts};
use opencomp_kernel::{OrderDrift, Taxonomy};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const SNAPSHOT_REF_PREFIX: &str = "ocs1_";

/// Errors raised while loading or saving a taxonomy store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("store not found: {0}")]
    NotFound(String),
}

/// A taxonomy plus what loading it had to repair.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyStore {
    taxonomy: Taxonomy,
    repaired: Vec<OrderDrift>,
}

impl TaxonomyStore {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            repaired: Vec::new(),
        }
    }

    /// Build a store from records, reconciling every order list against
    /// the live nodes.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut taxonomy = Taxonomy::from_parts(parts_from_records(records));
        let repaired = taxonomy.reconcile_orders();
        Self { taxonomy, repaired }
    }

    /// Load store state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let store = Self::from_records(read_records_from_path(path)?);
        tracing::debug!(
            path = %path.display(),
            nodes = store.taxonomy.len(),
            repaired = store.repaired.len(),
            "store loaded"
        );
        Ok(store)
    }

    /// Load store state, starting empty when the file does not exist yet.
    pub fn load_jsonl_or_empty(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load_jsonl(path);
        }
        tracing::debug!(path = %path.display(), "store missing; starting empty");
        Ok(Self::default())
    }

    /// Persist store state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        write_records_to_path(path, &self.records())?;
        Ok(())
    }

    /// Records in canonical order.
    pub fn records(&self) -> Vec<Record> {
        records_from_parts(self.taxonomy.to_parts())
    }

    /// SHA-256 over the canonical JSONL bytes of this store.
    pub fn snapshot_ref(&self) -> Result<String, StoreError> {
        let bytes = encode_records(&self.records())?;
        Ok(snapshot_ref_of(&bytes))
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn taxonomy_mut(&mut self) -> &mut Taxonomy {
        &mut self.taxonomy
    }

    pub fn into_taxonomy(self) -> Taxonomy {
        self.taxonomy
    }

    /// Order lists that were repaired while loading.
    pub fn repaired(&self) -> &[OrderDrift] {
        &self.repaired
    }
}

fn snapshot_ref_of(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{SNAPSHOT_REF_PREFIX}{:x}", hasher.finalize())
}
