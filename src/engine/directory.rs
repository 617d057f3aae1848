//! Directory preparation before a database file is opened

use std::fs;
use std::io;
use std::path::Path;

/// Create every missing directory above the database file at `path`.
///
/// In-memory databases, URI filenames and bare file names have nothing to
/// create and succeed immediately.
pub fn create_parent_directories(path: &Path) -> io::Result<()> {
    let text = path.to_string_lossy();
    if text.is_empty() || text.starts_with(":memory:") || text.starts_with("file:") {
        return Ok(());
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
