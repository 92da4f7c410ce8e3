//! JSON manifest sink.
//!
//! Writes to a temporary sibling first, fsyncs, then renames over the
//! destination, so a reader sees either the previous manifest or the new
//! one, never a partial file.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::collector::{CollectedRecord, CollectionResult};
use crate::error::OutputError;
use crate::output::file_lock::OutputLock;
use crate::output::{OutputReceipt, OutputSink};

#[derive(Serialize)]
struct Manifest<'a, V> {
    output_name: &'a str,
    generated_at: DateTime<Utc>,
    count: usize,
    records: &'a [CollectedRecord<V>],
}

/// Writes collected records as a JSON manifest at a fixed path.
///
/// Each write holds an [`OutputLock`] on `<path>.lock`; that file is left in
/// place between writes.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// A sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".tmp.{}", Uuid::new_v4()));
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<(), OutputError> {
        let temp_path = self.temp_path();
        let written = (|| {
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            drop(writer);
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(err) = written {
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }
            return Err(OutputError::from_io(&self.path, err));
        }
        Ok(())
    }
}

impl<V: Serialize> OutputSink<V> for JsonFileSink {
    fn write(&self, result: &CollectionResult<V>) -> Result<OutputReceipt, OutputError> {
        let _lock = OutputLock::acquire(&self.path).map_err(|err| OutputError::from_io(&self.path, err))?;

        let output_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let manifest = Manifest {
            output_name,
            generated_at: Utc::now(),
            count: result.count(),
            records: result.records(),
        };
        let bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| OutputError::Serialization {
            message: e.to_string(),
        })?;

        self.write_atomically(&bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "manifest written");

        Ok(OutputReceipt {
            location: self.path.display().to_string(),
            records_written: result.count(),
        })
    }
}
