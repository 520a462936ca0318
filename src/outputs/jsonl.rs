//! JSON Lines output.
//!
//! One record per line, appended as soon as it is retrieved, so a run that is
//! interrupted still leaves every finished record on disk.
//!
//! ```text
//! output/
//! └── jobs_2026-10-19_093000.jsonl
//! ```

use super::RecordSink;
use crate::models::Record;
use std::error::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct JsonLinesSink {
    path: String,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating the file if it does not exist.
    ///
    /// The parent directory must already exist; `main` checks it with
    /// [`crate::utils::ensure_writable_parent`] before any network work.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    #[instrument(level = "info", skip_all, fields(%path))]
    pub async fn create(path: &str) -> Result<Self, Box<dyn Error>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        info!("Opened JSON Lines output");
        Ok(Self {
            path: path.to_string(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    async fn push(&self, record: Record) -> Result<(), Box<dyn Error>> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!(url = %record.url, "Wrote record");
        Ok(())
    }
}
