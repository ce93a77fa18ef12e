//! Feature record sinks
//!
//! A harvest batch hands all of its records to a sink in one call, so a
//! batch is either persisted entirely or not at all.

use crate::error::SinkError;
use crate::features::FeatureRecord;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Destination for the feature records of a batch
#[async_trait]
pub trait FeatureSink: Send + Sync {
    /// Persist a batch, returning how many records were written
    async fn persist(&self, records: &[FeatureRecord]) -> Result<usize, SinkError>;
}

/// Writes records as newline-delimited JSON
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

impl JsonLinesSink {
    /// Wrap any writer
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Write to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Create (or truncate) a file and write to it
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

#[async_trait]
impl FeatureSink for JsonLinesSink {
    async fn persist(&self, records: &[FeatureRecord]) -> Result<usize, SinkError> {
        // Serialize up front so a bad record leaves the target untouched.
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        writer.write_all(&buf)?;
        writer.flush()?;

        info!(count = records.len(), "Persisted feature records");
        Ok(records.len())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<FeatureRecord>>,
    batches: Mutex<usize>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records persisted so far
    pub fn records(&self) -> Vec<FeatureRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `persist` calls received
    pub fn batches(&self) -> usize {
        self.batches.lock().map(|b| *b).unwrap_or_default()
    }
}

#[async_trait]
impl FeatureSink for MemorySink {
    async fn persist(&self, records: &[FeatureRecord]) -> Result<usize, SinkError> {
        self.records
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?
            .extend_from_slice(records);
        *self
            .batches
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))? += 1;
        Ok(records.len())
    }
}
