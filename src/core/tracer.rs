//! SQL and performance trace state
//!
//! [`Tracer`] holds the trace callbacks of one handle together with the
//! transaction-aware aggregation state: the aggregation flag, the footprint of
//! the current window and its cumulative cost. It never invokes callbacks
//! itself; it hands out [`PerformanceReport`]s that the owner delivers once its
//! locks are released.

use super::statement::TransactionType;
use super::Tag;
use std::collections::HashMap;
use std::sync::Arc;

/// SQL text mapped to its invocation count within one aggregation window
pub type Footprint = HashMap<String, u32>;

/// Receives the raw SQL text of every executed statement
pub type SqlTrace = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives `(tag, footprint, cumulative cost in nanoseconds)`
pub type PerformanceTrace = Arc<dyn Fn(Tag, &Footprint, u64) + Send + Sync>;

/// A flushed aggregation window, ready for delivery
pub struct PerformanceReport {
    footprint: Footprint,
    cost: u64,
    trace: Option<PerformanceTrace>,
}

impl PerformanceReport {
    /// Statements in the window with their invocation counts
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Summed cost of the window in nanoseconds
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Invoke the performance trace, if one was set when the window was flushed
    pub fn deliver(self, tag: Tag) {
        if let Some(trace) = self.trace {
            trace(tag, &self.footprint, self.cost);
        }
    }
}

impl std::fmt::Debug for PerformanceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceReport")
            .field("footprint", &self.footprint)
            .field("cost", &self.cost)
            .field("traced", &self.trace.is_some())
            .finish()
    }
}

/// Trace callbacks and aggregation state of a handle
#[derive(Default)]
pub struct Tracer {
    sql_trace: Option<SqlTrace>,
    performance_trace: Option<PerformanceTrace>,
    aggregation: bool,
    footprint: Footprint,
    cost: u64,
}

impl Tracer {
    /// Create a tracer with no callbacks and aggregation off
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the SQL trace; `None` disables it
    pub fn set_sql_trace(&mut self, trace: Option<SqlTrace>) {
        self.sql_trace = trace;
    }

    /// Replace the performance trace; `None` disables it
    pub fn set_performance_trace(&mut self, trace: Option<PerformanceTrace>) {
        self.performance_trace = trace;
    }

    /// The current SQL trace
    pub fn sql_trace(&self) -> Option<SqlTrace> {
        self.sql_trace.clone()
    }

    /// Whether profiling samples should be collected
    pub fn is_profiling(&self) -> bool {
        self.performance_trace.is_some()
    }

    /// Whether samples are currently merged into one window
    pub fn is_aggregating(&self) -> bool {
        self.aggregation
    }

    /// Apply the outcome of a transaction-control statement.
    ///
    /// Begin turns aggregation on and Commit turns it off, each only when it
    /// succeeded. Rollback always turns it off.
    pub fn transition(&mut self, transaction: TransactionType, succeeded: bool) {
        match transaction {
            TransactionType::Begin if succeeded => self.aggregation = true,
            TransactionType::Commit if succeeded => self.aggregation = false,
            TransactionType::Rollback => self.aggregation = false,
            _ => {}
        }
    }

    /// Record a profiling sample.
    ///
    /// Outside an aggregation window the pending window is flushed first and
    /// returned, so the new sample always starts a fresh one.
    pub fn record(&mut self, sql: &str, cost: u64) -> Option<PerformanceReport> {
        let flushed = if self.aggregation {
            None
        } else {
            self.take_report()
        };
        match self.footprint.get_mut(sql) {
            Some(count) => *count += 1,
            None => {
                self.footprint.insert(sql.to_string(), 1);
            }
        }
        self.cost = self.cost.saturating_add(cost);
        flushed
    }

    /// Take the pending window, leaving footprint and cost empty.
    ///
    /// Returns `None` when nothing is pending.
    pub fn take_report(&mut self) -> Option<PerformanceReport> {
        if self.footprint.is_empty() {
            return None;
        }
        Some(PerformanceReport {
            footprint: std::mem::take(&mut self.footprint),
            cost: std::mem::replace(&mut self.cost, 0),
            trace: self.performance_trace.clone(),
        })
    }

    /// The pending footprint
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// The pending cumulative cost
    pub fn cost(&self) -> u64 {
        self.cost
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("sql_trace", &self.sql_trace.is_some())
            .field("performance_trace", &self.performance_trace.is_some())
            .field("aggregation", &self.aggregation)
            .field("footprint", &self.footprint)
            .field("cost", &self.cost)
            .finish()
    }
}
