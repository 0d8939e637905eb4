//! Store file codec: one tagged record per line, `meta` first.
//!
//! Decoding checks the whole file before any record is used. The bytes
//! must be UTF-8 without NUL, every line must carry a known `record` tag,
//! and the single `meta` header must be the first record. Blank lines and
//! `#` comments are skipped. Writes replace the file through a synced
//! sibling temp file.

use crate::record::Record;
use chrono::Utc;
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors from reading or writing the store file.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The line is not a JSON object with a known `record` tag.
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// The tag is known but the fields do not fit it.
    #[error("line {line}: invalid `{tag}` record: {message}")]
    InvalidRecord {
        line: usize,
        tag: String,
        message: String,
    },

    #[error("line {line}: first record must be `meta`, found `{found}`")]
    MissingMeta { line: usize, found: String },

    #[error("line {line}: `meta` may only appear as the first record")]
    MisplacedMeta { line: usize },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupted store file {path}: {reason}")]
    Corrupt { path: String, reason: &'static str },
}

impl JsonlError {
    /// Source line of a decoding failure.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Malformed { line, .. }
            | Self::InvalidRecord { line, .. }
            | Self::MissingMeta { line, .. }
            | Self::MisplacedMeta { line } => Some(*line),
            _ => None,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> JsonlError + '_ {
    move |source| JsonlError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Decode store text into records.
pub fn decode_records(text: &str) -> Result<Vec<Record>, JsonlError> {
    let mut records: Vec<Record> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let record = decode_line(line, raw)?;
        match (&record, records.is_empty()) {
            (Record::Meta { .. }, true) => {}
            (Record::Meta { .. }, false) => return Err(JsonlError::MisplacedMeta { line }),
            (other, true) => {
                return Err(JsonlError::MissingMeta {
                    line,
                    found: other.as_str().to_string(),
                });
            }
            _ => {}
        }
        records.push(record);
    }
    Ok(records)
}

fn decode_line(line: usize, raw: &str) -> Result<Record, JsonlError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| JsonlError::Malformed {
        line,
        message: e.to_string(),
    })?;
    let Some(tag) = value.get("record").and_then(Value::as_str) else {
        return Err(JsonlError::Malformed {
            line,
            message: "missing `record` tag".to_string(),
        });
    };
    if !Record::TAGS.contains(&tag) {
        return Err(JsonlError::Malformed {
            line,
            message: format!("unknown record tag `{tag}`"),
        });
    }
    let tag = tag.to_string();
    serde_json::from_value(value).map_err(|e| JsonlError::InvalidRecord {
        line,
        tag,
        message: e.to_string(),
    })
}

/// Encode records to the exact bytes a save writes.
pub fn encode_records(records: &[Record]) -> Result<Vec<u8>, JsonlError> {
    let mut bytes = Vec::new();
    for record in records {
        serde_json::to_writer(&mut bytes, record)?;
        bytes.push(b'\n');
    }
    Ok(bytes)
}

/// Read and decode a store file.
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Vec<Record>, JsonlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(io_error(path))?;
    let corrupt = |reason| JsonlError::Corrupt {
        path: path.display().to_string(),
        reason,
    };
    if bytes.contains(&0) {
        return Err(corrupt("contains NUL bytes"));
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| corrupt("not valid UTF-8"))?;
    decode_records(text)
}

/// Encode records and replace the store file with them.
pub fn write_records_to_path(path: impl AsRef<Path>, records: &[Record]) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let bytes = encode_records(records)?;
    replace_file(path, &bytes)?;
    tracing::debug!(path = %path.display(), records = records.len(), "store written");
    Ok(())
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }

    let staging = staging_path(path);
    let staged = write_synced(&staging, bytes)
        .and_then(|()| fs::rename(&staging, path).map_err(io_error(path)));
    if let Err(err) = staged {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }

    if let Some(dir) = dir {
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(io_error(dir))?;
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(io_error(path))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging: OsString = path.as_os_str().to_os_string();
    staging.push(format!(
        ".{}.{}.staging",
        std::process::id(),
        Utc::now().format("%Y%m%dT%H%M%S%.f")
    ));
    PathBuf::from(staging)
}
