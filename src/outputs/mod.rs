//! Output sinks for extracted records.
//!
//! The worker pool hands every successfully retrieved [`Record`] to a
//! [`RecordSink`] exactly once.
//!
//! # Submodules
//!
//! - [`jsonl`]: appends records as JSON Lines to a file
//!
//! Tests drive the engine with `MemorySink`, which keeps records in memory.

pub mod jsonl;

use crate::models::Record;
use std::error::Error;
#[cfg(test)]
use std::sync::Mutex;

pub trait RecordSink {
    async fn push(&self, record: Record) -> Result<(), Box<dyn Error>>;
}

/// Collects records in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl RecordSink for MemorySink {
    async fn push(&self, record: Record) -> Result<(), Box<dyn Error>> {
        self.records
            .lock()
            .map_err(|e| e.to_string())?
            .push(record);
        Ok(())
    }
}
