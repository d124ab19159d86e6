//! Shared test utilities for the dirview test suite.
//!
//! The incremental engine is all about modification times, so the helpers
//! here are mostly about controlling them deterministically instead of
//! sleeping between runs.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Pin a file's modification time to an exact value.
pub fn set_file_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap_or_else(|e| panic!("cannot open {} for mtime change: {e}", path.display()))
        .set_modified(time)
        .unwrap_or_else(|e| panic!("cannot set mtime on {}: {e}", path.display()));
}

/// Move a file's modification time forward by `delta`.
pub fn shift_mtime(path: &Path, delta: Duration) {
    let current = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|e| panic!("cannot stat {}: {e}", path.display()));
    set_file_mtime(path, current + delta);
}
