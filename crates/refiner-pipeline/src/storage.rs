//! Durable sinks for finished batches.
//!
//! The orchestrator knows nothing about backends; it hands a
//! [`BatchReport`] to a [`StorageSink`] and gets a receipt or an error back.

use flate2::write::GzEncoder;
use flate2::Compression;
use refiner_core::{BatchReport, RecordResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Fallback timestamp when formatting fails
const FALLBACK_TIMESTAMP: &str = "1970-01-01T00:00:00Z";
/// File name of the batch summary inside a blob container. Record blobs
/// always end in `.blob`, so no record id can map onto it.
pub const SUMMARY_BLOB: &str = "summary.json.gz";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {id:?} maps to blob {path} already written in this batch")]
    BlobCollision { id: String, path: PathBuf },
}

impl StorageError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a sink wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistReceipt {
    pub backend: &'static str,
    pub location: PathBuf,
    /// Number of entries written (backend specific).
    pub entries: usize,
}

pub trait StorageSink {
    fn persist(&mut self, report: &BatchReport) -> Result<PersistReceipt, StorageError>;
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
    }
    Ok(())
}

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| FALLBACK_TIMESTAMP.to_string())
}

/// Writes the whole report as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonDocumentSink {
    path: PathBuf,
}

impl JsonDocumentSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorageSink for JsonDocumentSink {
    fn persist(&mut self, report: &BatchReport) -> Result<PersistReceipt, StorageError> {
        ensure_parent(&self.path)?;
        let file = File::create(&self.path).map_err(StorageError::io(&self.path))?;
        serde_json::to_writer_pretty(file, report).map_err(StorageError::json(&self.path))?;
        Ok(PersistReceipt {
            backend: "json",
            location: self.path.clone(),
            entries: report.results.len(),
        })
    }
}

/// Writes one gzip-compressed JSON blob per refined record into a container
/// directory, plus the batch summary under [`SUMMARY_BLOB`].
#[derive(Debug, Clone)]
pub struct BlobSink {
    container: PathBuf,
}

impl BlobSink {
    pub fn new(container: impl Into<PathBuf>) -> Self {
        Self {
            container: container.into(),
        }
    }

    /// Path of the blob for record `id`.
    ///
    /// Ids made of `[A-Za-z0-9_-]` are used as is. Any other id is sanitized
    /// and gets `.<hash of the raw id>` appended; the dot never survives
    /// sanitizing, so the two forms cannot meet.
    pub fn blob_path(&self, id: &str) -> PathBuf {
        let name: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let name = if name == id && !id.is_empty() {
            name
        } else {
            let hash = blake3::hash(id.as_bytes()).to_hex();
            format!("{name}.{}", &hash.as_str()[..16])
        };
        self.container.join(format!("{name}.blob"))
    }

    fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let file = File::create(path).map_err(StorageError::io(path))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        serde_json::to_writer_pretty(&mut encoder, value).map_err(StorageError::json(path))?;
        encoder
            .finish()
            .and_then(|mut f| f.flush())
            .map_err(StorageError::io(path))
    }
}

impl StorageSink for BlobSink {
    fn persist(&mut self, report: &BatchReport) -> Result<PersistReceipt, StorageError> {
        fs::create_dir_all(&self.container).map_err(StorageError::io(&self.container))?;
        let mut written = HashSet::new();
        for record in report.refined() {
            let path = self.blob_path(&record.id);
            if !written.insert(path.clone()) {
                return Err(StorageError::BlobCollision {
                    id: record.id.clone(),
                    path,
                });
            }
            Self::write_blob(&path, record)?;
        }
        let entries = written.len();
        Self::write_blob(&self.container.join(SUMMARY_BLOB), &report.summary)?;
        Ok(PersistReceipt {
            backend: "blob",
            location: self.container.clone(),
            entries,
        })
    }
}

/// Metadata stored next to every list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntryMeta {
    pub timestamp: String,
    /// Size of the serialized `data` in bytes.
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: String,
    pub metadata: ListEntryMeta,
    pub data: RecordResult,
}

/// Appends every record result to a JSON list file.
#[derive(Debug, Clone)]
pub struct ListSink {
    path: PathBuf,
}

impl ListSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the current list; a missing file is an empty list.
    pub fn load(&self) -> Result<Vec<ListEntry>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(StorageError::io(&self.path))?;
        serde_json::from_reader(BufReader::new(file)).map_err(StorageError::json(&self.path))
    }
}

impl StorageSink for ListSink {
    fn persist(&mut self, report: &BatchReport) -> Result<PersistReceipt, StorageError> {
        let mut list = self.load()?;
        let ts = iso8601_now();
        for result in &report.results {
            let size = serde_json::to_vec(result)
                .map_err(StorageError::json(&self.path))?
                .len();
            list.push(ListEntry {
                id: result.id().to_string(),
                metadata: ListEntryMeta {
                    timestamp: ts.clone(),
                    size,
                },
                data: result.clone(),
            });
        }
        ensure_parent(&self.path)?;
        let file = File::create(&self.path).map_err(StorageError::io(&self.path))?;
        serde_json::to_writer_pretty(file, &list).map_err(StorageError::json(&self.path))?;
        Ok(PersistReceipt {
            backend: "list",
            location: self.path.clone(),
            entries: list.len(),
        })
    }
}
