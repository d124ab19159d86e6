//! Shared types built fresh during each walk.
//!
//! Nothing here is persisted verbatim: the snapshot store keeps a reduced
//! projection of these records (see [`crate::snapshot`]), and the records
//! themselves are rebuilt from the filesystem on every run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// One file observed in a directory during this run.
///
/// Identity is the file name within its directory. The preview fields start
/// out empty and are filled in by [`crate::preview::ensure_preview`].
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// File name within its directory.
    pub name: String,
    /// Absolute path to the source file.
    pub abs_path: PathBuf,
    /// Source modification time, fractional seconds since the Unix epoch.
    pub mtime: f64,
    /// Deterministic path of the preview artifact for this file.
    pub preview_path: PathBuf,
    /// Whether the preview artifact exists on disk.
    pub preview_exists: bool,
    /// Whether a generation attempt was made during this run.
    pub preview_generated: bool,
    /// Preview artifact modification time; 0.0 when absent.
    pub preview_mtime: f64,
    /// Content hash of the source, only when fingerprint mode is on.
    pub fingerprint: Option<String>,
}

impl FileRecord {
    /// A fresh record for a file seen during the directory scan.
    ///
    /// Preview fields are unset until the preview cache has looked at it.
    pub fn new(name: String, abs_path: PathBuf, mtime: f64) -> Self {
        Self {
            name,
            abs_path,
            mtime,
            preview_path: PathBuf::new(),
            preview_exists: false,
            preview_generated: false,
            preview_mtime: 0.0,
            fingerprint: None,
        }
    }
}

/// What one directory looks like this run: sorted subdirectory names plus
/// one [`FileRecord`] per surviving file, keyed (and therefore ordered) by
/// name. Never persisted — feeds the snapshot store and the index renderer.
#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub subdirs: Vec<String>,
    pub files: BTreeMap<String, FileRecord>,
}

impl DirectoryListing {
    /// True when the directory held no real content after filtering.
    pub fn is_empty(&self) -> bool {
        self.subdirs.is_empty() && self.files.is_empty()
    }
}

/// Convert a filesystem timestamp to fractional seconds since the epoch.
///
/// Timestamps before the epoch collapse to 0.0, which change detection
/// treats the same as "never seen".
pub fn mtime_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
