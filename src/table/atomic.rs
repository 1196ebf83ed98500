// src/table/atomic.rs
//! Writes a table to a temporary file next to its destination and renames it
//! into place on `finish()`. Dropping the writer early removes the temp file.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct AtomicTableWriter {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
}

impl AtomicTableWriter {
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self> {
        let final_path = final_path.as_ref().to_path_buf();
        let parent_dir = match final_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent_dir)
            .with_context(|| format!("Failed to create output directory {}", parent_dir.display()))?;

        let temp_file = NamedTempFile::new_in(&parent_dir)
            .with_context(|| format!("Failed to create temporary file in {}", parent_dir.display()))?;

        Ok(Self {
            writer: Writer::from_writer(BufWriter::new(temp_file)),
            final_path,
        })
    }

    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(row)
            .with_context(|| format!("Failed to write row to {}", self.final_path.display()))
    }

    /// Flushes and atomically replaces the destination. Returns its path.
    pub fn finish(self) -> Result<PathBuf> {
        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush table writer: {}", e.error()))?;
        let temp_file = buf_writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush buffer: {}", e.error()))?;
        temp_file
            .persist(&self.final_path)
            .map_err(|e| anyhow::anyhow!("Failed to persist {}: {}", self.final_path.display(), e.error))?;
        Ok(self.final_path)
    }
}
