//! LineDB - Minimal embedded line-oriented document store
//!
//! An append-only record log (one marker-prefixed JSON record per line)
//! paired with an in-process query engine:
//! - Boolean combinators (`$and` / `$or`) with set-algebra semantics
//! - Comparison operators (`$eq`, `$in`, `$lt`, `$gt`)
//! - Whole-word full-text matching over configured fields (`$text`)
//! - Result shaping: stable multi-key sort and field projection
//! - Tombstone deletes: rows are flag-flipped in place, never removed
//!
//! ```no_run
//! use linedb::{Database, FindOptions, Query, Record, SortOrder};
//! use serde_json::json;
//!
//! # fn main() -> linedb::Result<()> {
//! let db = Database::open_or_create("people.db", &["bio"])?;
//! db.insert(Record::from_json(json!({"name": "Ann", "age": 30, "bio": "fast and curious"}))?)?;
//!
//! let adults = db.find_with(
//!     &Query::gt("age", 18),
//!     &FindOptions::new()
//!         .sort_by("age", SortOrder::Ascending)
//!         .project(&["name"]),
//! )?;
//! # let _ = adults;
//! db.delete(&Query::eq("name", "Ann"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Known limitation
//!
//! There is no concurrency control across store instances or processes.
//! Mutations on one `Database` are serialized by an internal lock, but two
//! instances (or two processes) over the same file can race: a delete's
//! load-then-rewrite window can lose an insert that lands in between. The
//! contract is that callers serialize their own access to one store
//! instance.

pub mod error;
pub mod log;
pub mod query;
pub mod record;
pub mod shape;
pub mod store;
pub mod value;

pub use error::{Result, StoreError};
pub use log::{RecordLog, Row};
pub use query::{FieldClause, FieldOp, Query};
pub use record::Record;
pub use shape::{FindOptions, SortKey, SortOrder};
pub use store::Database;
pub use value::FieldValue;
