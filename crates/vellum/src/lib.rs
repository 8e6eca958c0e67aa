//! Vellum is an embedded document database with a SQL query surface.
//!
//! Records are semi-structured documents stored in a transactional ordered
//! key-value engine (any implementation of the `vellum-engine` traits);
//! tables are logical namespaces over engine stores; secondary indexes
//! mirror selected document paths in value order. SQL statements are
//! parsed into a logical plan tree and executed as a pull-based stream of
//! documents.
//!
//! ```
//! use vellum::{Database, Params};
//! use vellum_engine::MemoryEngine;
//!
//! let db = Database::new(MemoryEngine::new()).unwrap();
//! let mut tx = db.begin(true).unwrap();
//! tx.exec("CREATE TABLE users", &Params::new()).unwrap();
//! tx.exec("INSERT INTO users VALUES {name: 'ada', score: 42}", &Params::new())
//!     .unwrap();
//! let rows = tx
//!     .query("SELECT name FROM users WHERE score >= ?", &Params::new().bind(40i64))
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! tx.commit().unwrap();
//! ```

pub mod error;
pub mod execution;
pub mod parsing;
pub mod planning;
pub mod record;
pub mod storage;
pub mod types;

mod database;

pub use database::{Database, Transaction};
pub use error::{Error, Result};
pub use execution::{Cancellation, Output, Params};
pub use types::{Array, Document, FieldBuffer, Path, PathComponent, Value, ValueKind};

pub use vellum_engine::IterControl;
