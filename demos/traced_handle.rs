//! Traced handle example
//!
//! This example demonstrates:
//! - Routing engine diagnostics and handle errors through `tracing`
//! - SQL and performance traces
//! - Transaction-aware aggregation of performance samples
//! - WAL commit notification
//!
//! Run with: cargo run --example traced_handle

use rust_database_handle::core::set_error_reporter;
use rust_database_handle::engine::install_engine_log;
use rust_database_handle::prelude::*;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    if let Err(err) = install_engine_log() {
        println!("engine log not installed: {}", err);
    }

    println!("=== Rust Database Handle - Traced Handle Example ===\n");

    set_error_reporter(Some(Arc::new(|err: &HandleError| {
        println!("   reporter: {}", err);
    })));

    let dir = tempfile::tempdir().map_err(|err| HandleError::abort(err.to_string()))?;
    let mut handle = Handle::new(dir.path().join("demo").join("app.db"));
    handle.set_tag(1);
    handle.set_sql_trace(Some(Arc::new(|sql: &str| println!("   SQL: {}", sql))));
    handle.set_performance_trace(Some(Arc::new(
        |tag: Tag, footprint: &Footprint, cost: u64| {
            println!("   perf[tag {}]: {}ns", tag, cost);
            for (sql, count) in footprint {
                println!("      {} x{}", sql, count);
            }
        },
    )));

    println!("1. Opening database...");
    handle.open()?;
    println!("   ✓ Opened {}\n", handle.path().display());

    println!("2. Switching to WAL and registering the committed hook...");
    let mut journal = handle.prepare("PRAGMA journal_mode=WAL")?;
    println!("   journal_mode = {:?}", journal.query(&[])?[0][0].as_str());
    drop(journal);
    handle.register_committed_hook(
        Some(|info: &HandleInfo<'_>, pages: i32, label: &String| {
            println!("   {}: tag {} committed, {} WAL pages", label, info.tag(), pages);
        }),
        "hook".to_string(),
    );
    println!();

    println!("3. Creating schema...");
    handle.exec("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)")?;
    println!();

    println!("4. Inserting inside a transaction (one aggregated report)...");
    {
        let tx = Transaction::begin(&handle)?;
        let mut insert = tx.handle().prepare("INSERT INTO users (name) VALUES (?)")?;
        for name in ["Alice", "Bob", "Charlie"] {
            insert.execute(&[Value::from(name)])?;
        }
        drop(insert);
        tx.commit()?;
    }
    println!("   last row id = {}\n", handle.last_inserted_row_id());

    println!("5. Querying...");
    let mut select = handle.prepare("SELECT id, name FROM users ORDER BY id")?;
    for row in select.query(&[])? {
        println!("   {:?} {:?}", row[0].as_i64(), row[1].as_str());
    }
    drop(select);
    println!();

    println!("6. Error handling...");
    if let Err(err) = handle.exec("INSERT INTO nowhere VALUES (1)") {
        println!("   ✓ Caught: {}", err.message());
    }
    if let Err(err) = handle.prepare("BEGIN") {
        println!("   ✓ Caught: {}", err);
    }
    println!();

    println!("7. Flushing pending statistics...");
    handle.report_performance();
    handle.close()?;
    println!("   ✓ Closed\n");

    println!("=== Example completed successfully ===");
    Ok(())
}
