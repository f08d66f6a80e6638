// src/storage/mod.rs
pub mod stats;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::CanonicalRecord;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/<source>.jsonl`, with the source name reduced to a file-safe form
    pub fn records_path(&self, source_name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.jsonl", file_stem(source_name)))
    }

    /// Opens (truncating) the record stream for one source.
    pub fn open_records(&self, source_name: &str) -> Result<JsonlWriter, StorageError> {
        let path = self.records_path(source_name);
        let file = fs::File::create(&path).map_err(StorageError::IoError)?;
        tracing::info!("Writing records to {}", path.display());
        Ok(JsonlWriter { path, out: BufWriter::new(file), written: 0 })
    }

    /// Directory for review copies of pages that needed the fallback scan.
    pub fn review_dir(&self) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir.join("review");
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
        }
        Ok(dir)
    }
}

/// Lowercase ASCII alphanumerics, everything else collapsed to `_`.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    stem.trim_matches('_').to_string()
}

/// Newline-delimited JSON, one canonical record per line.
pub struct JsonlWriter {
    path: PathBuf,
    out: BufWriter<fs::File>,
    written: usize,
}

impl JsonlWriter {
    pub fn write(&mut self, record: &CanonicalRecord) -> Result<(), StorageError> {
        serde_json::to_writer(&mut self.out, record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[CanonicalRecord]) -> Result<(), StorageError> {
        records.iter().try_for_each(|record| self.write(record))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and returns the file path.
    pub fn finish(mut self) -> Result<PathBuf, StorageError> {
        self.out.flush()?;
        tracing::info!("Saved {} record(s) to {}", self.written, self.path.display());
        Ok(self.path)
    }
}
