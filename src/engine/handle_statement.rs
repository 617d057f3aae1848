//! Prepared statements bound to a handle

use super::handle::Handle;
use crate::core::{HandleOperation, Result, Row, Value};

/// A compiled statement borrowed from its [`Handle`]
///
/// Executions raise the handle's trace events and record failures in its
/// last-error slot as `Exec` errors.
pub struct HandleStatement<'h> {
    stmt: rusqlite::Statement<'h>,
    handle: &'h Handle,
    sql: String,
}

impl<'h> HandleStatement<'h> {
    pub(crate) fn new(stmt: rusqlite::Statement<'h>, handle: &'h Handle, sql: String) -> Self {
        Self { stmt, handle, sql }
    }

    /// The SQL text this statement was compiled from
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The handle this statement belongs to
    pub fn handle(&self) -> &'h Handle {
        self.handle
    }

    /// Number of result columns
    pub fn column_count(&self) -> usize {
        self.stmt.column_count()
    }

    /// Names of the result columns
    pub fn column_names(&self) -> Vec<String> {
        self.stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Run the statement with `params`, returning the number of changed rows
    pub fn execute(&mut self, params: &[Value]) -> Result<usize> {
        let handle = self.handle;
        let result = self.bind(params).and_then(|()| {
            let stmt = &mut self.stmt;
            handle.traced(&self.sql, || stmt.raw_execute())
        });
        self.settle(result)
    }

    /// Run the statement with `params` and collect every result row
    pub fn query(&mut self, params: &[Value]) -> Result<Vec<Row>> {
        let handle = self.handle;
        let column_count = self.stmt.column_count();
        let result = self.bind(params).and_then(|()| {
            let stmt = &mut self.stmt;
            handle.traced(&self.sql, || {
                let mut rows = stmt.raw_query();
                let mut results = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut values = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        values.push(Value::from(row.get_ref(i)?));
                    }
                    results.push(values);
                }
                Ok(results)
            })
        });
        self.settle(result)
    }

    /// Bind every parameter; a count mismatch fails before the engine runs
    fn bind(&mut self, params: &[Value]) -> rusqlite::Result<()> {
        let expected = self.stmt.parameter_count();
        if params.len() != expected {
            return Err(rusqlite::Error::InvalidParameterCount(
                params.len(),
                expected,
            ));
        }
        for (index, value) in params.iter().enumerate() {
            self.stmt.raw_bind_parameter(index + 1, value)?;
        }
        Ok(())
    }

    fn settle<T>(&self, result: rusqlite::Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.handle.clear_error();
                Ok(value)
            }
            Err(err) => Err(self
                .handle
                .record_engine_error(HandleOperation::Exec, &err, Some(&self.sql))),
        }
    }
}

impl std::fmt::Debug for HandleStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleStatement")
            .field("sql", &self.sql)
            .field("tag", &self.handle.tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_statement_execute_error_recorded() {
        let mut handle = Handle::new(":memory:");
        handle.open().unwrap();
        handle
            .exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .unwrap();

        let mut insert = handle.prepare("INSERT INTO t (id) VALUES (?)").unwrap();
        insert.execute(&[Value::Integer(1)]).unwrap();

        let err = insert.execute(&[Value::Integer(1)]).unwrap_err();
        assert_eq!(err.operation(), Some(HandleOperation::Exec));
        assert_eq!(err.sql(), Some("INSERT INTO t (id) VALUES (?)"));
        assert!(insert.handle().error().is_some());

        insert.execute(&[Value::Integer(2)]).unwrap();
        assert!(handle.error().is_none());
    }

    #[test]
    fn test_statement_parameter_count_checked_before_running() {
        let mut handle = Handle::new(":memory:");
        handle.open().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        handle.set_sql_trace(Some(Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::Relaxed);
        })));

        let mut select = handle.prepare("SELECT ?").unwrap();
        let err = select.query(&[]).unwrap_err();
        assert_eq!(err.operation(), Some(HandleOperation::Exec));
        assert_eq!(runs.load(Ordering::Relaxed), 0);

        let rows = select.query(&[Value::from(7)]).unwrap();
        assert_eq!(rows, vec![vec![Value::Integer(7)]]);
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_statement_query_types() {
        let mut handle = Handle::new(":memory:");
        handle.open().unwrap();

        let mut select = handle
            .prepare("SELECT 1, 2.5, 'x', x'0102', NULL")
            .unwrap();
        assert_eq!(select.column_count(), 5);
        let rows = select.query(&[]).unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Text("x".to_string()),
                Value::Blob(vec![1, 2]),
                Value::Null,
            ]]
        );
    }
}
