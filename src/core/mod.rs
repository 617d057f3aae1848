//! Core handle types
//!
//! This module provides the building blocks shared by the engine layer:
//! error types and the reporting sink, statement descriptions, trace state,
//! and bound values.

pub mod error;
pub mod reporter;
pub mod statement;
pub mod tracer;
pub mod value;

/// Caller-assigned identifier of a handle, used for error and trace attribution
pub type Tag = i32;

/// Tag of a handle that was never tagged
pub const INVALID_TAG: Tag = 0;

// Re-export commonly used types
pub use error::{HandleError, HandleOperation, Result};
pub use reporter::{set_error_reporter, ErrorReporter};
pub use statement::{
    Sql, Statement, StatementTransaction, StatementType, TransactionMode, TransactionType,
};
pub use tracer::{Footprint, PerformanceReport, PerformanceTrace, SqlTrace, Tracer};
pub use value::{Row, Value};
