//! Process-wide error reporting sink
//!
//! Every error a handle records passes through [`report`]. It is always logged
//! through `tracing`; applications that persist or forward diagnostics can
//! install an additional [`ErrorReporter`].

use super::error::HandleError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{error, warn};

/// Callback receiving every reported handle error
pub type ErrorReporter = Arc<dyn Fn(&HandleError) + Send + Sync>;

static REPORTER: RwLock<Option<ErrorReporter>> = parking_lot::const_rwlock(None);

/// Install a reporter, returning the previous one. `None` removes it.
pub fn set_error_reporter(reporter: Option<ErrorReporter>) -> Option<ErrorReporter> {
    std::mem::replace(&mut *REPORTER.write(), reporter)
}

/// Log an error and forward it to the installed reporter
pub fn report(err: &HandleError) {
    match err {
        HandleError::Sqlite {
            operation,
            code,
            extended_code,
            message,
            sql,
            tag,
            path,
        } => error!(
            %operation,
            code,
            extended_code = ?extended_code,
            sql = ?sql,
            tag,
            path = %path.display(),
            "{}",
            message
        ),
        HandleError::Abort { message } => error!("abort: {}", message),
    }

    // Cloned out so a reporter may replace itself
    let reporter = REPORTER.read().clone();
    if let Some(reporter) = reporter {
        reporter(err);
    }
}

/// Log a message emitted by the engine itself rather than by a handle operation
pub fn report_engine_log(code: i32, message: &str) {
    warn!(code, "sqlite: {}", message);
}
