//! Lock-scoped read-modify-write of the taxonomy store file.
//!
//! A mutation holds `<store>.lock` (created exclusively) from load to
//! save. A second writer fails fast with `LockBusy` instead of waiting.

use crate::{StoreError, TaxonomyStore};
use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut path: OsString = store_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error("taxonomy store lock busy: {}", lock_path.display())]
    LockBusy { lock_path: PathBuf },

    #[error("failed to acquire taxonomy store lock {}: {source}", lock_path.display())]
    LockIo {
        lock_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store changed since the caller read `expected`.
    #[error("store changed since read: expected {expected}, found {actual}")]
    SnapshotMismatch { expected: String, actual: String },

    #[error("{0}")]
    Mutation(E),
}

impl<E> AtomicStoreMutationError<E> {
    /// Stable failure class for machine-readable output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::LockBusy { .. } => "lock_busy",
            Self::LockIo { .. } => "lock_io",
            Self::Store(_) => "store",
            Self::SnapshotMismatch { .. } => "snapshot_mismatch",
            Self::Mutation(_) => "mutation",
        }
    }
}

/// Execute one lock-scoped mutation against a taxonomy JSONL path.
///
/// A missing store starts empty. When `expected_snapshot` is given the
/// loaded store must still hash to it. The mutator returns
/// `(value, changed)`; only `changed == true` writes the store back, and
/// it does so before the lock is released. A mutator error is returned
/// as `Mutation` and nothing is written.
pub fn mutate_taxonomy_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    expected_snapshot: Option<&str>,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut TaxonomyStore) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _lock = StoreLock::acquire::<E>(path)?;

    let mut store = TaxonomyStore::load_jsonl_or_empty(path)?;
    if let Some(expected) = expected_snapshot {
        let actual = store.snapshot_ref()?;
        if actual != expected {
            return Err(AtomicStoreMutationError::SnapshotMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    let (value, changed) = mutator(&mut store).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        store.save_jsonl(path)?;
    }
    Ok(value)
}

/// Held lock file; removed on drop.
struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    fn acquire<E>(store_path: &Path) -> Result<Self, AtomicStoreMutationError<E>> {
        let path = store_lock_path(store_path);
        let lock_io = |source: io::Error| -> AtomicStoreMutationError<E> {
            AtomicStoreMutationError::LockIo {
                lock_path: path.clone(),
                source,
            }
        };
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(lock_io)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!(lock = %path.display(), "store lock already held");
                return Err(AtomicStoreMutationError::LockBusy { lock_path: path });
            }
            Err(err) => return Err(lock_io(err)),
        };
        // Holder details are informational; a failed write still holds the lock.
        let _ = writeln!(
            file,
            "pid={} acquired={}",
            std::process::id(),
            Utc::now().to_rfc3339()
        );
        Ok(Self { path, _file: file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
