//! Write-ahead-log commit notification
//!
//! SQLite reports every commit in WAL mode through `sqlite3_wal_hook`, which
//! only takes a C function pointer and an opaque argument. The handle owns the
//! boxed [`CommittedHook`] that argument points at and detaches it from the
//! engine before the box is replaced or dropped.

use crate::core::Tag;
use rusqlite::{ffi, Connection};
use std::ffi::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::error;

type WalHook = unsafe extern "C" fn(*mut c_void, *mut ffi::sqlite3, *const c_char, c_int) -> c_int;

/// Identity of the handle whose commit fired a hook
#[derive(Debug, Clone, Copy)]
pub struct HandleInfo<'a> {
    tag: Tag,
    path: &'a Path,
}

impl<'a> HandleInfo<'a> {
    /// Tag of the handle at the time of the commit
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Path the handle was opened on
    pub fn path(&self) -> &'a Path {
        self.path
    }
}

type OnCommitted = Box<dyn Fn(&HandleInfo<'_>, i32) + Send>;

/// A registered hook: the caller's callback with its context, plus the identity of
/// the owning handle
pub(crate) struct CommittedHook {
    tag: Arc<AtomicI32>,
    path: PathBuf,
    on_committed: OnCommitted,
}

impl CommittedHook {
    pub(crate) fn new<C, F>(tag: Arc<AtomicI32>, path: PathBuf, on_committed: F, context: C) -> Self
    where
        F: Fn(&HandleInfo<'_>, i32, &C) + Send + 'static,
        C: Send + 'static,
    {
        Self {
            tag,
            path,
            on_committed: Box::new(move |info: &HandleInfo<'_>, pages: i32| {
                on_committed(info, pages, &context)
            }),
        }
    }

    fn notify(&self, pages: i32) {
        let info = HandleInfo {
            tag: self.tag.load(Ordering::Relaxed),
            path: &self.path,
        };
        // Unwinding into the engine would abort the process
        if panic::catch_unwind(AssertUnwindSafe(|| (self.on_committed)(&info, pages))).is_err() {
            error!(tag = info.tag, pages, "committed hook panicked");
        }
    }
}

unsafe extern "C" fn wal_hook_trampoline(
    argument: *mut c_void,
    _db: *mut ffi::sqlite3,
    _database_name: *const c_char,
    pages: c_int,
) -> c_int {
    // SAFETY: `argument` was set by `attach` to a CommittedHook that stays alive
    // until it is detached.
    let hook = &*(argument as *const CommittedHook);
    hook.notify(pages);
    ffi::SQLITE_OK
}

/// Point the engine's WAL hook at `hook`, or detach it with `None`.
///
/// `hook` must not move or drop until it is detached or `connection` is closed.
pub(crate) fn attach(connection: &Connection, hook: Option<&CommittedHook>) {
    let (callback, argument): (Option<WalHook>, *mut c_void) = match hook {
        Some(hook) => (
            Some(wal_hook_trampoline),
            hook as *const CommittedHook as *mut c_void,
        ),
        None => (None, ptr::null_mut()),
    };
    // SAFETY: the raw handle is valid while `connection` is borrowed.
    unsafe {
        ffi::sqlite3_wal_hook(connection.handle(), callback, argument);
    }
}
