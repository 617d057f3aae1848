//! Connection handle
//!
//! [`Handle`] owns one native SQLite connection and routes every statement
//! through it. On top of the raw engine calls it keeps a single last-error
//! slot, raises SQL and profiling trace events, aggregates profiling samples
//! across explicit transactions, and forwards WAL commit notifications.

use super::committed_hook::{self, CommittedHook, HandleInfo};
use super::directory;
use super::handle_statement::HandleStatement;
use crate::core::{
    reporter, HandleError, HandleOperation, PerformanceTrace, Result, SqlTrace, Statement,
    StatementType, Tag, Tracer, INVALID_TAG,
};
use parking_lot::Mutex;
use rusqlite::{ffi, Batch, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Open-time configuration of a handle
#[derive(Debug, Clone)]
pub struct HandleConfig {
    /// Flags passed to the engine when opening
    pub open_flags: OpenFlags,
    /// Create missing parent directories before opening
    pub create_directories: bool,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            open_flags: OpenFlags::default(),
            create_directories: true,
        }
    }
}

impl HandleConfig {
    /// Create the default configuration: read/write, create if missing
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for opening an existing database read-only
    pub fn read_only() -> Self {
        Self {
            open_flags: OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            create_directories: false,
        }
    }

    /// Set the engine open flags
    pub fn with_open_flags(mut self, flags: OpenFlags) -> Self {
        self.open_flags = flags;
        self
    }

    /// Enable or disable parent directory creation
    pub fn with_create_directories(mut self, create: bool) -> Self {
        self.create_directories = create;
        self
    }
}

/// A connection to one database file
///
/// # Example
///
/// ```no_run
/// use rust_database_handle::prelude::*;
///
/// fn main() -> Result<()> {
///     let mut handle = Handle::new("data/app.db");
///     handle.set_tag(1);
///     handle.open()?;
///
///     handle.exec("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT)")?;
///     handle.exec(&StatementTransaction::begin())?;
///     handle.exec("INSERT OR REPLACE INTO kv VALUES ('a', '1')")?;
///     handle.exec(&StatementTransaction::commit())?;
///
///     handle.close()
/// }
/// ```
pub struct Handle {
    connection: Option<Connection>,
    path: PathBuf,
    config: HandleConfig,
    tag: Arc<AtomicI32>,
    error: Mutex<Option<HandleError>>,
    tracer: Mutex<Tracer>,
    committed_hook: Option<Box<CommittedHook>>,
}

impl Handle {
    /// Create a closed handle bound to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, HandleConfig::default())
    }

    /// Create a closed handle bound to `path` with a custom configuration
    pub fn with_config(path: impl AsRef<Path>, config: HandleConfig) -> Self {
        Self {
            connection: None,
            path: path.as_ref().to_path_buf(),
            config,
            tag: Arc::new(AtomicI32::new(INVALID_TAG)),
            error: Mutex::new(None),
            tracer: Mutex::new(Tracer::new()),
            committed_hook: None,
        }
    }

    /// Open the native connection.
    ///
    /// Missing parent directories are created first when configured; failing
    /// to create them is logged and the open is attempted anyway.
    pub fn open(&mut self) -> Result<()> {
        if self.config.create_directories {
            if let Err(err) = directory::create_parent_directories(&self.path) {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to create parent directories"
                );
            }
        }

        match Connection::open_with_flags(&self.path, self.config.open_flags) {
            Ok(connection) => {
                if let Some(connection) = &self.connection {
                    committed_hook::attach(connection, None);
                }
                self.connection = Some(connection);
                self.attach_committed_hook();
                self.clear_error();
                debug!(tag = self.tag(), path = %self.path.display(), "handle opened");
                Ok(())
            }
            Err(err) => Err(self.record_engine_error(HandleOperation::Open, &err, None)),
        }
    }

    /// Close the native connection.
    ///
    /// Pending performance statistics are not reported; dropping the handle
    /// reports them before closing. Closing a closed handle succeeds.
    pub fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            self.clear_error();
            return Ok(());
        };

        committed_hook::attach(&connection, None);
        match connection.close() {
            Ok(()) => {
                self.clear_error();
                debug!(tag = self.tag(), path = %self.path.display(), "handle closed");
                Ok(())
            }
            Err((connection, err)) => {
                let err = self.record_engine_error(HandleOperation::Close, &err, None);
                self.connection = Some(connection);
                self.attach_committed_hook();
                Err(err)
            }
        }
    }

    /// Whether the native connection is open
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Compile a statement.
    ///
    /// Transaction-control statements are rejected with an abort error without
    /// reaching the engine; run them through [`Handle::exec`].
    pub fn prepare<S>(&self, statement: &S) -> Result<HandleStatement<'_>>
    where
        S: Statement + ?Sized,
    {
        if statement.statement_type() == StatementType::Transaction {
            return Err(self.record(HandleError::abort(
                "[prepare] a transaction is not allowed, use [exec] instead",
            )));
        }

        let description = statement.description();
        let sql: &str = &description;
        let connection = self
            .connection_for(HandleOperation::Prepare, sql)
            .map_err(|err| self.record(err))?;
        match connection.prepare(sql) {
            Ok(stmt) => {
                self.clear_error();
                Ok(HandleStatement::new(stmt, self, sql.to_string()))
            }
            Err(err) => Err(self.record_engine_error(HandleOperation::Prepare, &err, Some(sql))),
        }
    }

    /// Execute a statement without returning rows.
    ///
    /// Text holding several `;`-separated statements runs them in order and
    /// stops at the first failure. Each one raises its own trace events.
    ///
    /// A successful BEGIN opens an aggregation window for performance samples
    /// and a successful COMMIT closes it. ROLLBACK closes it whether or not it
    /// succeeded.
    pub fn exec<S>(&self, statement: &S) -> Result<()>
    where
        S: Statement + ?Sized,
    {
        let description = statement.description();
        let sql: &str = &description;
        let result = self
            .connection_for(HandleOperation::Exec, sql)
            .and_then(|connection| {
                self.exec_batch(connection, sql).map_err(|err| {
                    HandleError::from_engine(
                        HandleOperation::Exec,
                        &err,
                        Some(sql),
                        self.tag(),
                        &self.path,
                    )
                })
            });

        if statement.statement_type() == StatementType::Transaction {
            if let Some(transaction) = statement.transaction_type() {
                self.tracer.lock().transition(transaction, result.is_ok());
            }
        }

        match result {
            Ok(()) => {
                self.clear_error();
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Set the SQL trace; `None` disables it
    pub fn set_sql_trace(&self, trace: Option<SqlTrace>) {
        self.tracer.lock().set_sql_trace(trace);
    }

    /// Set the performance trace; `None` disables it
    pub fn set_performance_trace(&self, trace: Option<PerformanceTrace>) {
        self.tracer.lock().set_performance_trace(trace);
    }

    /// Deliver the pending footprint and cost to the performance trace and
    /// clear them. Does nothing when no sample is pending.
    pub fn report_performance(&self) {
        let report = self.tracer.lock().take_report();
        if let Some(report) = report {
            report.deliver(self.tag());
        }
    }

    /// Whether performance samples are currently merged into one window
    pub fn is_aggregating(&self) -> bool {
        self.tracer.lock().is_aggregating()
    }

    /// Register a callback for every commit the engine writes to the WAL.
    ///
    /// The callback receives this handle's identity, the number of pages in the
    /// WAL after the commit and `context`. `None` unregisters. Registration
    /// replaces any previous hook and survives close/open cycles.
    pub fn register_committed_hook<C, F>(&mut self, on_committed: Option<F>, context: C)
    where
        F: Fn(&HandleInfo<'_>, i32, &C) + Send + 'static,
        C: Send + 'static,
    {
        let hook = on_committed.map(|on_committed| {
            Box::new(CommittedHook::new(
                Arc::clone(&self.tag),
                self.path.clone(),
                on_committed,
                context,
            ))
        });
        let previous = std::mem::replace(&mut self.committed_hook, hook);
        self.attach_committed_hook();
        drop(previous);
    }

    /// Remove the committed hook
    pub fn clear_committed_hook(&mut self) {
        self.register_committed_hook(None::<fn(&HandleInfo<'_>, i32, &())>, ());
    }

    /// Set the caller-assigned tag
    pub fn set_tag(&self, tag: Tag) {
        self.tag.store(tag, Ordering::Relaxed);
    }

    /// The caller-assigned tag
    pub fn tag(&self) -> Tag {
        self.tag.load(Ordering::Relaxed)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The error of the last operation, `None` if it succeeded
    pub fn error(&self) -> Option<HandleError> {
        self.error.lock().clone()
    }

    /// Row id of the most recent successful INSERT, 0 if none or closed
    pub fn last_inserted_row_id(&self) -> i64 {
        self.connection
            .as_ref()
            .map_or(0, |connection| connection.last_insert_rowid())
    }

    /// Rows modified by the most recent INSERT, UPDATE or DELETE
    pub fn changes(&self) -> u64 {
        self.connection
            .as_ref()
            .map_or(0, |connection| connection.changes())
    }

    /// Whether the engine opened the main database read-only
    pub fn is_readonly(&self) -> bool {
        self.connection.as_ref().is_some_and(|connection| {
            // SAFETY: the raw handle is valid while `connection` is borrowed and
            // the schema name is a NUL-terminated literal.
            unsafe { ffi::sqlite3_db_readonly(connection.handle(), c"main".as_ptr()) == 1 }
        })
    }

    fn exec_batch(&self, connection: &Connection, sql: &str) -> rusqlite::Result<()> {
        let mut batch = Batch::new(connection, sql);
        while let Some(mut stmt) = batch.next()? {
            let text = statement_text(&stmt, sql);
            self.traced(&text, || {
                // Result rows are stepped through and discarded
                let mut rows = stmt.raw_query();
                while rows.next()?.is_some() {}
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Run a compiled statement through `f`, raising the SQL trace before it
    /// and recording a profiling sample once it has finished, failed or not.
    pub(crate) fn traced<T>(
        &self,
        sql: &str,
        f: impl FnOnce() -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        let (sql_trace, profiling) = {
            let tracer = self.tracer.lock();
            (tracer.sql_trace(), tracer.is_profiling())
        };
        if let Some(trace) = sql_trace {
            trace(sql);
        }
        if !profiling {
            return f();
        }

        let started = Instant::now();
        let result = f();
        let cost = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.add_performance_sample(sql, cost);
        result
    }

    fn add_performance_sample(&self, sql: &str, cost: u64) {
        let flushed = self.tracer.lock().record(sql, cost);
        if let Some(report) = flushed {
            report.deliver(self.tag());
        }
    }

    fn connection_for(&self, operation: HandleOperation, sql: &str) -> Result<&Connection> {
        self.connection.as_ref().ok_or_else(|| {
            HandleError::not_open(operation, Some(sql), self.tag(), &self.path)
        })
    }

    fn attach_committed_hook(&self) {
        if let Some(connection) = &self.connection {
            committed_hook::attach(connection, self.committed_hook.as_deref());
        }
    }

    pub(crate) fn record_engine_error(
        &self,
        operation: HandleOperation,
        err: &rusqlite::Error,
        sql: Option<&str>,
    ) -> HandleError {
        self.record(HandleError::from_engine(
            operation,
            err,
            sql,
            self.tag(),
            &self.path,
        ))
    }

    fn record(&self, err: HandleError) -> HandleError {
        reporter::report(&err);
        *self.error.lock() = Some(err.clone());
        err
    }

    pub(crate) fn clear_error(&self) {
        *self.error.lock() = None;
    }
}

/// SQL text of one statement out of `batch`, without surrounding whitespace or
/// the terminating `;`
fn statement_text(stmt: &rusqlite::Statement<'_>, batch: &str) -> String {
    match stmt.expanded_sql() {
        Some(text) => text.trim().trim_end_matches(';').trim_end().to_string(),
        None => batch.trim().to_string(),
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.path)
            .field("tag", &self.tag())
            .field("open", &self.is_open())
            .field("error", &*self.error.lock())
            .field("tracer", &*self.tracer.lock())
            .field("committed_hook", &self.committed_hook.is_some())
            .finish()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.report_performance();
        if let Err(err) = self.close() {
            warn!(tag = self.tag(), error = %err, "failed to close handle on drop");
        }
    }
}
