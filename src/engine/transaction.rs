//! Transaction guard for automatic rollback on drop
//!
//! This module provides RAII-style transaction management on top of
//! [`Handle::exec`], so the handle's aggregation window is always closed.

use super::handle::Handle;
use crate::core::{Result, Statement, StatementTransaction, TransactionMode};
use tracing::{debug, warn};

/// Transaction guard that rolls back on drop if not committed
///
/// # Example
///
/// ```no_run
/// use rust_database_handle::prelude::*;
///
/// fn transfer(handle: &Handle) -> Result<()> {
///     let tx = Transaction::begin(handle)?;
///     tx.exec("UPDATE accounts SET balance = balance - 100 WHERE id = 1")?;
///     tx.exec("UPDATE accounts SET balance = balance + 100 WHERE id = 2")?;
///     tx.commit()
/// }
/// ```
pub struct Transaction<'h> {
    handle: &'h Handle,
    finished: bool,
}

impl<'h> Transaction<'h> {
    /// Begin a deferred transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or a transaction is already active
    pub fn begin(handle: &'h Handle) -> Result<Self> {
        Self::start(handle, StatementTransaction::begin())
    }

    /// Begin a transaction with an explicit locking mode
    pub fn begin_with(handle: &'h Handle, mode: TransactionMode) -> Result<Self> {
        Self::start(handle, StatementTransaction::begin_with(mode))
    }

    fn start(handle: &'h Handle, begin: StatementTransaction) -> Result<Self> {
        handle.exec(&begin)?;
        Ok(Self {
            handle,
            finished: false,
        })
    }

    /// The handle running this transaction
    pub fn handle(&self) -> &'h Handle {
        self.handle
    }

    /// Execute a statement within the transaction
    pub fn exec<S>(&self, statement: &S) -> Result<()>
    where
        S: Statement + ?Sized,
    {
        self.handle.exec(statement)
    }

    /// Commit the transaction
    ///
    /// On failure the guard is dropped and rolls back.
    pub fn commit(mut self) -> Result<()> {
        self.handle.exec(&StatementTransaction::commit())?;
        self.finished = true;
        Ok(())
    }

    /// Explicitly roll back the transaction
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.handle.exec(&StatementTransaction::rollback())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.handle.exec(&StatementTransaction::rollback()) {
            Ok(()) => debug!(tag = self.handle.tag(), "transaction rolled back on drop"),
            Err(err) => warn!(
                tag = self.handle.tag(),
                error = %err,
                "transaction auto-rollback failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn count(handle: &Handle) -> i64 {
        let mut stmt = handle.prepare("SELECT COUNT(*) FROM test").unwrap();
        stmt.query(&[]).unwrap()[0][0].as_i64().unwrap()
    }

    fn setup() -> Handle {
        let mut handle = Handle::new(":memory:");
        handle.open().unwrap();
        handle
            .exec("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)")
            .unwrap();
        handle
    }

    #[test]
    fn test_transaction_commit() {
        let handle = setup();
        {
            let tx = Transaction::begin(&handle).unwrap();
            assert!(tx.handle().is_aggregating());
            tx.exec("INSERT INTO test (value) VALUES ('test1')").unwrap();
            tx.commit().unwrap();
        }
        assert!(!handle.is_aggregating());
        assert_eq!(count(&handle), 1);
    }

    #[test]
    fn test_transaction_rollback_on_drop() {
        let handle = setup();
        {
            let tx = Transaction::begin_with(&handle, TransactionMode::Immediate).unwrap();
            tx.exec("INSERT INTO test (value) VALUES ('test1')").unwrap();
        }
        assert!(!handle.is_aggregating());
        assert_eq!(count(&handle), 0);
    }

    #[test]
    fn test_transaction_explicit_rollback() {
        let handle = setup();
        let tx = Transaction::begin(&handle).unwrap();
        let mut insert = tx
            .handle()
            .prepare("INSERT INTO test (value) VALUES (?)")
            .unwrap();
        insert.execute(&[Value::from("a")]).unwrap();
        drop(insert);
        tx.rollback().unwrap();
        assert_eq!(count(&handle), 0);
    }

    #[test]
    fn test_transaction_begin_twice_fails() {
        let handle = setup();
        let _tx = Transaction::begin(&handle).unwrap();
        assert!(Transaction::begin(&handle).is_err());
        assert!(handle.is_aggregating());
    }
}
