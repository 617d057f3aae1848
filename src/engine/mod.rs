//! SQLite engine layer
//!
//! This module contains the connection [`Handle`], the prepared statements it
//! hands out, and the pieces that talk to the engine directly.

pub mod committed_hook;
pub mod directory;
pub mod handle;
pub mod handle_statement;
pub mod transaction;

pub use committed_hook::HandleInfo;
pub use handle::{Handle, HandleConfig};
pub use handle_statement::HandleStatement;
pub use transaction::Transaction;

use crate::core::reporter;
use std::ffi::c_int;

fn engine_log(code: c_int, message: &str) {
    reporter::report_engine_log(code, message);
}

/// Route SQLite's internal diagnostics (`SQLITE_CONFIG_LOG`) to `tracing`.
///
/// The engine only accepts this before it is initialized, so call it once at
/// startup before any handle is opened. Later calls fail with `SQLITE_MISUSE`.
pub fn install_engine_log() -> rusqlite::Result<()> {
    // SAFETY: `engine_log` is a plain function that is safe to call from any
    // thread; the engine rejects the call once it is running.
    unsafe { rusqlite::trace::config_log(Some(engine_log)) }
}
