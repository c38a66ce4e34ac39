//! Store facade
//!
//! Ties the record log, query evaluator, and result shaper together behind
//! `find` / `insert` / `delete`. Mutations on one instance are serialized
//! by an internal write lock; coordinating access across instances or
//! processes is the caller's job (see the crate docs).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::log::RecordLog;
use crate::query::Query;
use crate::record::Record;
use crate::shape::{shape, FindOptions};
use crate::value::FieldValue;

/// An embedded single-file document store
pub struct Database {
    log: RecordLog,
    full_text_fields: Vec<String>,
    write_lock: Mutex<()>,
}

impl Database {
    /// Create a fresh store; fails if the file already exists
    ///
    /// `full_text_fields` is the fixed set of fields eligible for `$text`
    /// matching. It is configuration, never derived from data.
    pub fn create(path: impl Into<PathBuf>, full_text_fields: &[&str]) -> Result<Self> {
        let log = RecordLog::new(path);
        log.create_new()?;
        Ok(Self::assemble(log, full_text_fields))
    }

    /// Open an existing store; a missing file is an IO error
    pub fn open(path: impl Into<PathBuf>, full_text_fields: &[&str]) -> Result<Self> {
        let log = RecordLog::new(path);
        if !log.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "store file not found").into());
        }
        Ok(Self::assemble(log, full_text_fields))
    }

    /// Open an existing store or create a fresh one
    pub fn open_or_create(path: impl Into<PathBuf>, full_text_fields: &[&str]) -> Result<Self> {
        let log = RecordLog::new(path);
        if !log.exists() {
            log.create_new()?;
        }
        Ok(Self::assemble(log, full_text_fields))
    }

    fn assemble(log: RecordLog, full_text_fields: &[&str]) -> Self {
        Self {
            log,
            full_text_fields: full_text_fields.iter().map(|f| f.to_string()).collect(),
            write_lock: Mutex::new(()),
        }
    }

    /// Run a query and return matching records as copies
    pub fn find(&self, query: &Query) -> Result<Vec<Record>> {
        self.find_with(query, &FindOptions::default())
    }

    /// Run a query with sort/projection options
    ///
    /// Loads the log, filters to live rows, evaluates the query, shapes the
    /// result. Never mutates storage.
    pub fn find_with(&self, query: &Query, options: &FindOptions) -> Result<Vec<Record>> {
        let rows = self.log.load()?;
        let live: Vec<&Record> = rows.iter().filter(|r| r.live).map(|r| &r.record).collect();
        let matched: Vec<Record> = query
            .evaluate(&live, &self.full_text_fields)
            .into_iter()
            .cloned()
            .collect();
        Ok(shape(matched, options))
    }

    /// Append one record as a live row
    pub fn insert(&self, record: Record) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        for field in &self.full_text_fields {
            match record.get(field) {
                Some(FieldValue::Str(_)) | None => {}
                Some(_) => tracing::warn!(
                    "full-text field {} is not a string; $text will not match it",
                    field
                ),
            }
        }
        self.log.append(&record)
    }

    /// Tombstone every live record matching the query and rewrite the log
    ///
    /// The matched set is built by record content, so structurally identical
    /// live rows are tombstoned together. Dead rows stay in the file; only
    /// their marker changes, and row order is preserved.
    pub fn delete(&self, query: &Query) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut rows = self.log.load()?;

        let matched: Vec<Record> = {
            let live: Vec<&Record> = rows.iter().filter(|r| r.live).map(|r| &r.record).collect();
            query
                .evaluate(&live, &self.full_text_fields)
                .into_iter()
                .cloned()
                .collect()
        };
        if matched.is_empty() {
            return Ok(());
        }

        let mut tombstoned = 0;
        for row in &mut rows {
            if row.live && matched.contains(&row.record) {
                row.live = false;
                tombstoned += 1;
            }
        }

        tracing::debug!("delete tombstoned {} rows", tombstoned);
        self.log.rewrite_all(&rows)
    }

    // ========== Accessors ==========

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Fields eligible for `$text` matching
    pub fn full_text_fields(&self) -> &[String] {
        &self.full_text_fields
    }
}
