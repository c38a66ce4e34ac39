//! Append-only record log
//!
//! On-disk format, one record per line, EOF-bounded:
//!
//! ```text
//! E{"age":30,"name":"Ann"}
//! D{"age":40,"name":"Bob"}
//! ```
//!
//! The leading marker is `E` (exists/live) or `D` (deleted/tombstone).
//! Lines are never removed: a delete flips the marker and rewrites the file
//! in full, re-emitting every row (live and dead) in original order.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::record::Record;

/// Marker for a live row
const LIVE: char = 'E';

/// Marker for a tombstoned row
const DEAD: char = 'D';

/// A stored line: liveness flag plus record payload
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub live: bool,
    pub record: Record,
}

/// The on-disk record log
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the backing file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty backing file; fails if one already exists
    pub fn create_new(&self) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        Ok(())
    }

    /// Read the full log in stored order
    ///
    /// Any line without a valid marker or with an undecodable payload aborts
    /// the load; corruption is never silently skipped.
    pub fn load(&self) -> Result<Vec<Row>> {
        let content = fs::read_to_string(&self.path)?;
        let mut rows = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            rows.push(decode_line(idx + 1, line)?);
        }
        tracing::debug!("loaded {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Append one record as a live row at the end of the file
    ///
    /// Writes a single newline-terminated line; never reads existing
    /// content, so the file grows monotonically.
    pub fn append(&self, record: &Record) -> Result<()> {
        let line = encode_line(true, record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Replace the file contents with the given rows
    ///
    /// Writes to a temp file next to the log and renames it into place, so
    /// a failed rewrite leaves the original file intact.
    pub fn rewrite_all(&self, rows: &[Row]) -> Result<()> {
        let mut content = String::new();
        for row in rows {
            content.push_str(&encode_line(row.live, &row.record)?);
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("rewrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

fn encode_line(live: bool, record: &Record) -> Result<String> {
    let marker = if live { LIVE } else { DEAD };
    let payload = serde_json::to_string(record)?;
    Ok(format!("{}{}\n", marker, payload))
}

fn decode_line(line_no: usize, line: &str) -> Result<Row> {
    let live = match line.chars().next() {
        Some(c) if c == LIVE => true,
        Some(c) if c == DEAD => false,
        _ => {
            return Err(StoreError::MalformedLine {
                line: line_no,
                reason: "missing live/tombstone marker".to_string(),
            })
        }
    };

    // Markers are ASCII, so the payload starts at byte 1
    let record = serde_json::from_str(&line[1..]).map_err(|e| StoreError::MalformedLine {
        line: line_no,
        reason: e.to_string(),
    })?;

    Ok(Row { live, record })
}
