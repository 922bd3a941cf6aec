//! Durable storage for the invoice collection.
//!
//! A backend holds one slot: the full collection, serialized as a JSON array.
//! [`InvoiceStore`](crate::store::InvoiceStore) calls `load` once at startup
//! and `save` after every mutation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::StorageError;
use crate::model::Invoice;

/// Fixed key under which the whole collection is stored.
pub const STORAGE_KEY: &str = "invoices";

pub trait InvoiceBackend {
    /// Read the stored collection. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Invoice>>, StorageError>;

    /// Replace the stored collection.
    fn save(&mut self, invoices: &[Invoice]) -> Result<(), StorageError>;
}

/// Serialize a collection into the on-disk format.
pub fn encode(invoices: &[Invoice]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(invoices)?)
}

/// Parse the on-disk format. Content that is not a JSON array is an error.
/// Records inside the array are read one by one and any that cannot be read
/// are skipped with a warning, so one bad record never hides the rest.
pub fn decode(raw: &str) -> Result<Vec<Invoice>, StorageError> {
    let records: Vec<Value> = serde_json::from_str(raw)?;
    let total = records.len();
    let invoices: Vec<Invoice> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let id = record.get("id").and_then(Value::as_str).map(str::to_owned);
            match serde_json::from_value(record) {
                Ok(invoice) => Some(invoice),
                Err(e) => {
                    tracing::warn!(index, id = ?id, error = %e, "skipping unreadable invoice");
                    None
                }
            }
        })
        .collect();
    if invoices.len() < total {
        tracing::warn!(kept = invoices.len(), total, "some stored invoices could not be read");
    }
    Ok(invoices)
}

/// Stores the collection as `<dir>/invoices.json`.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl InvoiceBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Vec<Invoice>>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        decode(&raw).map(Some)
    }

    fn save(&mut self, invoices: &[Invoice]) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let body = encode(invoices)?;

        // Write beside the target and rename so a crash never leaves a
        // half-written collection behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

/// Keeps the serialized slot in memory. Used by tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Option<String>,
    writes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose slot already holds `raw`, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Some(raw.into()),
            writes: 0,
        }
    }

    /// Number of successful saves.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl InvoiceBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Vec<Invoice>>, StorageError> {
        self.slot.as_deref().map(decode).transpose()
    }

    fn save(&mut self, invoices: &[Invoice]) -> Result<(), StorageError> {
        self.slot = Some(encode(invoices)?);
        self.writes += 1;
        Ok(())
    }
}
