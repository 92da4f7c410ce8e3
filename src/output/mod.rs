//! Output sinks: where collected winners go once a run finishes.
//!
//! Writing the native plugin format is the host's concern. This module
//! defines the [`OutputSink`] seam plus two sinks: [`MemorySink`] for
//! embedding and tests, and [`JsonFileSink`], which writes a manifest
//! atomically under an exclusive file lock.

mod file_lock;
mod json;

pub use file_lock::OutputLock;
pub use json::JsonFileSink;

use std::sync::{Mutex, PoisonError};

use crate::collector::{CollectedRecord, CollectionResult};
use crate::error::OutputError;

/// Acknowledgement from a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReceipt {
    /// Human-readable destination (a path, or `memory`).
    pub location: String,
    /// Number of records persisted.
    pub records_written: usize,
}

/// Destination for a finished collection.
///
/// # Contract
/// - Called once per run, only after collection completed.
/// - On error, nothing partial may remain at the destination.
pub trait OutputSink<V> {
    /// Persists the collected records.
    ///
    /// # Errors
    /// Any [`OutputError`]; the destination is left as it was.
    fn write(&self, result: &CollectionResult<V>) -> Result<OutputReceipt, OutputError>;
}

/// Keeps the last written records in memory.
#[derive(Debug)]
pub struct MemorySink<V> {
    records: Mutex<Vec<CollectedRecord<V>>>,
}

impl<V> Default for MemorySink<V> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<V: Clone> MemorySink<V> {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records from the most recent write.
    #[must_use]
    pub fn written(&self) -> Vec<CollectedRecord<V>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<V: Clone> OutputSink<V> for MemorySink<V> {
    fn write(&self, result: &CollectionResult<V>) -> Result<OutputReceipt, OutputError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = result.records().to_vec();
        Ok(OutputReceipt {
            location: "memory".to_string(),
            records_written: guard.len(),
        })
    }
}
