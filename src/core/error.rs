//! Error types for the connection handle
//!
//! Every failing handle operation produces a [`HandleError`]. The handle keeps the
//! most recent one in its last-error slot and forwards it to the process-wide
//! reporter (see [`crate::core::reporter`]).

use super::Tag;
use rusqlite::ffi;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result type alias for handle operations
pub type Result<T> = std::result::Result<T, HandleError>;

/// The handle operation that produced an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandleOperation {
    /// Opening the native connection
    Open,
    /// Closing the native connection
    Close,
    /// Compiling a statement
    Prepare,
    /// Running a statement
    Exec,
}

impl HandleOperation {
    /// Convert the operation to its string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            HandleOperation::Open => "open",
            HandleOperation::Close => "close",
            HandleOperation::Prepare => "prepare",
            HandleOperation::Exec => "exec",
        }
    }
}

impl std::fmt::Display for HandleOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Error types for handle operations
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandleError {
    /// The engine rejected an operation
    #[error("[{operation}] {message} (code {code}, tag {tag}, path {})", .path.display())]
    Sqlite {
        operation: HandleOperation,
        code: i32,
        extended_code: Option<i32>,
        message: String,
        sql: Option<String>,
        tag: Tag,
        path: PathBuf,
    },

    /// A caller broke the handle's usage contract; the engine was never reached
    #[error("Abort: {message}")]
    Abort { message: String },
}

impl HandleError {
    /// Create an abort error for a contract violation
    pub fn abort<S: Into<String>>(message: S) -> Self {
        HandleError::Abort {
            message: message.into(),
        }
    }

    /// Create an engine error from its raw parts
    pub fn sqlite(
        operation: HandleOperation,
        code: i32,
        extended_code: Option<i32>,
        message: impl Into<String>,
        sql: Option<&str>,
        tag: Tag,
        path: &Path,
    ) -> Self {
        HandleError::Sqlite {
            operation,
            code,
            extended_code,
            message: message.into(),
            sql: sql.map(str::to_string),
            tag,
            path: path.to_path_buf(),
        }
    }

    /// Normalize a `rusqlite` error into an engine error
    pub(crate) fn from_engine(
        operation: HandleOperation,
        err: &rusqlite::Error,
        sql: Option<&str>,
        tag: Tag,
        path: &Path,
    ) -> Self {
        let native = match err {
            rusqlite::Error::SqlInputError { error, .. } => Some(error),
            other => other.sqlite_error(),
        };
        let (code, extended_code) = match native {
            Some(native) => (native.extended_code & 0xff, Some(native.extended_code)),
            None => (ffi::SQLITE_ERROR, None),
        };
        let message = match err {
            rusqlite::Error::SqliteFailure(native, None) => native.to_string(),
            rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
            rusqlite::Error::SqlInputError { msg, .. } => msg.clone(),
            other => other.to_string(),
        };
        Self::sqlite(operation, code, extended_code, message, sql, tag, path)
    }

    /// Error raised when an engine call is attempted on a closed handle
    pub(crate) fn not_open(
        operation: HandleOperation,
        sql: Option<&str>,
        tag: Tag,
        path: &Path,
    ) -> Self {
        Self::sqlite(
            operation,
            ffi::SQLITE_MISUSE,
            None,
            "database handle is not open",
            sql,
            tag,
            path,
        )
    }

    /// The failing operation, `None` for aborts
    pub fn operation(&self) -> Option<HandleOperation> {
        match self {
            HandleError::Sqlite { operation, .. } => Some(*operation),
            HandleError::Abort { .. } => None,
        }
    }

    /// Primary engine result code
    pub fn code(&self) -> Option<i32> {
        match self {
            HandleError::Sqlite { code, .. } => Some(*code),
            HandleError::Abort { .. } => None,
        }
    }

    /// Extended engine result code, when the engine provided one
    pub fn extended_code(&self) -> Option<i32> {
        match self {
            HandleError::Sqlite { extended_code, .. } => *extended_code,
            HandleError::Abort { .. } => None,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            HandleError::Sqlite { message, .. } | HandleError::Abort { message } => message,
        }
    }

    /// The offending SQL text
    pub fn sql(&self) -> Option<&str> {
        match self {
            HandleError::Sqlite { sql, .. } => sql.as_deref(),
            HandleError::Abort { .. } => None,
        }
    }

    /// Check if this is a contract violation
    pub fn is_abort(&self) -> bool {
        matches!(self, HandleError::Abort { .. })
    }

    /// Serialize the error for persistence by a reporter
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_error_creation() {
        let err = HandleError::abort("not allowed");
        assert!(err.is_abort());
        assert_eq!(err.operation(), None);
        assert_eq!(err.message(), "not allowed");

        let err = HandleError::sqlite(
            HandleOperation::Exec,
            1,
            Some(1),
            "boom",
            Some("SELECT"),
            7,
            Path::new("a.db"),
        );
        assert_eq!(err.operation(), Some(HandleOperation::Exec));
        assert_eq!(err.code(), Some(1));
        assert_eq!(err.sql(), Some("SELECT"));
    }

    #[test]
    fn test_error_display() {
        let err = HandleError::abort("[prepare] nope");
        assert_eq!(err.to_string(), "Abort: [prepare] nope");

        let err = HandleError::sqlite(
            HandleOperation::Open,
            14,
            None,
            "unable to open database file",
            None,
            3,
            Path::new("data/x.db"),
        );
        assert_eq!(
            err.to_string(),
            "[open] unable to open database file (code 14, tag 3, path data/x.db)"
        );
    }

    #[test]
    fn test_from_engine_syntax_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.prepare("SELEC 1").unwrap_err();

        let err = HandleError::from_engine(
            HandleOperation::Prepare,
            &err,
            Some("SELEC 1"),
            0,
            Path::new(":memory:"),
        );
        assert_eq!(err.code(), Some(ffi::SQLITE_ERROR));
        assert!(err.message().contains("syntax error"));
        assert_eq!(err.sql(), Some("SELEC 1"));
    }

    #[test]
    fn test_from_engine_extended_code() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .unwrap();
        conn.execute_batch("INSERT INTO t (id) VALUES (1)").unwrap();
        let err = conn
            .execute_batch("INSERT INTO t (id) VALUES (1)")
            .unwrap_err();

        let err = HandleError::from_engine(
            HandleOperation::Exec,
            &err,
            None,
            0,
            Path::new(":memory:"),
        );
        assert_eq!(err.code(), Some(ffi::SQLITE_CONSTRAINT));
        assert_eq!(
            err.extended_code(),
            Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        );
    }

    #[test]
    fn test_error_json() {
        let err = HandleError::abort("bad");
        let json = err.to_json().unwrap();
        assert_eq!(json, r#"{"kind":"abort","message":"bad"}"#);

        let err = HandleError::not_open(HandleOperation::Exec, None, 0, Path::new("x.db"));
        let json = err.to_json().unwrap();
        assert!(json.contains(r#""kind":"sqlite""#));
        assert!(json.contains(r#""operation":"Exec""#));
    }
}
