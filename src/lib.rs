//! # Rust Database Handle
//!
//! A traced, transaction-aware connection handle over an embedded SQLite engine.
//!
//! A [`Handle`] owns exactly one native connection to one database file. Every
//! statement is prepared or executed through it, and on top of the raw engine
//! calls it provides:
//!
//! - **Error normalization**: every failure becomes a [`HandleError`] carrying the
//!   operation, engine codes, message, offending SQL, tag and path. The handle
//!   keeps the latest one and forwards it to a process-wide reporter.
//! - **Tracing**: an SQL trace receives the text of every executed statement, a
//!   performance trace receives aggregated footprints with their cost.
//! - **Transaction-aware aggregation**: samples between a successful `BEGIN` and
//!   its `COMMIT`/`ROLLBACK` are reported as one footprint.
//! - **Commit notification**: a hook fired for every commit written to the WAL.
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rust_database_handle = "0.1"
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use rust_database_handle::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let mut handle = Handle::new("data/users.db");
//!     handle.set_tag(1);
//!     handle.set_sql_trace(Some(Arc::new(|sql: &str| println!("SQL: {}", sql))));
//!     handle.set_performance_trace(Some(Arc::new(
//!         |tag: Tag, footprint: &Footprint, cost: u64| {
//!             println!("tag {}: {} statements in {}ns", tag, footprint.len(), cost);
//!         },
//!     )));
//!     handle.open()?;
//!
//!     handle.exec("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!     handle.exec(&StatementTransaction::begin())?;
//!     handle.exec("INSERT INTO users (name) VALUES ('Alice')")?;
//!     handle.exec("INSERT INTO users (name) VALUES ('Bob')")?;
//!     handle.exec(&StatementTransaction::commit())?;
//!
//!     let mut select = handle.prepare("SELECT name FROM users")?;
//!     for row in select.query(&[])? {
//!         println!("User: {:?}", row[0].as_str());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_database_handle/
//! ├── src/
//! │   ├── core/                  # Engine-independent types
//! │   │   ├── error.rs           # HandleError, HandleOperation
//! │   │   ├── reporter.rs        # Process-wide error sink
//! │   │   ├── statement.rs       # Statement trait, Sql, StatementTransaction
//! │   │   ├── tracer.rs          # Trace callbacks and aggregation state
//! │   │   ├── value.rs           # Bound and returned values
//! │   │   └── mod.rs
//! │   ├── engine/                # SQLite engine layer
//! │   │   ├── handle.rs          # Handle, HandleConfig
//! │   │   ├── handle_statement.rs
//! │   │   ├── committed_hook.rs  # WAL commit notification
//! │   │   ├── directory.rs       # Parent directory creation
//! │   │   ├── transaction.rs     # RAII transaction guard
//! │   │   └── mod.rs
//! │   └── lib.rs
//! ├── demos/                     # Example programs
//! ├── tests/                     # Integration tests
//! └── Cargo.toml
//! ```

/// Core handle types
pub mod core;

/// SQLite engine layer
pub mod engine;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_database_handle::prelude::*;
///
/// fn main() -> Result<()> {
///     let mut handle = Handle::new(":memory:");
///     handle.open()?;
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        Footprint, HandleError, HandleOperation, PerformanceTrace, Result, Row, Sql, SqlTrace,
        Statement, StatementTransaction, StatementType, Tag, TransactionMode, TransactionType,
        Value, INVALID_TAG,
    };

    pub use crate::engine::{Handle, HandleConfig, HandleInfo, HandleStatement, Transaction};
}

// Re-export at root level for convenience
pub use crate::core::{
    Footprint, HandleError, HandleOperation, PerformanceTrace, Result, Sql, SqlTrace, Statement,
    StatementTransaction, Tag, Value, INVALID_TAG,
};
pub use crate::engine::{Handle, HandleConfig, HandleStatement, Transaction};
