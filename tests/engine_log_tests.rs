//! Engine diagnostics routing
//!
//! The engine accepts its log callback only before initialization, so this
//! binary installs it before any handle is opened.

use rust_database_handle::engine::install_engine_log;
use rust_database_handle::prelude::*;

#[test]
fn test_engine_log_installed_before_open() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    install_engine_log().expect("engine log must install before first open");

    let mut handle = Handle::new(":memory:");
    handle.open().unwrap();
    // Errors raised by the engine go through the log callback as well
    assert!(handle.exec("SELECT * FROM nowhere").is_err());
    handle.close().unwrap();
}
