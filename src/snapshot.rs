//! Per-directory snapshot store.
//!
//! Each processed directory owns a `snapshot.json` inside its administrative
//! subtree recording what the previous run saw there: the subdirectory names
//! and, per file, the modification time plus the preview-cache outcome. The
//! change detector compares this against the fresh listing to decide whether
//! the directory's index needs regenerating.
//!
//! # Design
//!
//! - **Load never fails.** A missing, unreadable, or corrupt snapshot is
//!   indistinguishable from a first run: [`DirectorySnapshot::load`] returns
//!   an empty snapshot and the directory is simply reprocessed. The cost of
//!   a lost snapshot is recomputation, never wrong output.
//! - **Save is a full replace.** There are no partial updates; the record is
//!   rewritten in one piece whenever change is detected, so a reader never
//!   observes a half-merged state.
//! - **Identity is name + mtime, not content.** A file replaced with
//!   different bytes but the same name and modification time is not detected
//!   as changed. The optional fingerprint mode (see
//!   [`crate::config::SnapshotConfig`]) closes that hole when asked to.

use crate::types::DirectoryListing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Name of the snapshot record within the administrative subtree.
pub const SNAPSHOT_FILENAME: &str = "snapshot.json";

/// The reduced per-file projection that survives between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    /// Source modification time, fractional seconds since the Unix epoch.
    pub mtime: f64,
    /// A generation attempt was made for this file.
    #[serde(default)]
    pub preview_generated: bool,
    /// The attempt (or an earlier run) left an artifact on disk.
    #[serde(default)]
    pub preview_exists: bool,
    /// Artifact modification time; 0.0 when absent.
    #[serde(default)]
    pub preview_mtime: f64,
    /// Content hash, present only when fingerprint mode was on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// What the previous run saw in one directory.
///
/// Exactly two top-level fields: `dirs` (ordered subdirectory names) and
/// `files` (name → [`FileState`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub dirs: Vec<String>,
    pub files: BTreeMap<String, FileState>,
}

impl DirectorySnapshot {
    /// An empty snapshot, meaning "no prior run".
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is no recorded prior state at all.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// Load the snapshot from an administrative directory.
    ///
    /// Missing, unreadable, or corrupt records all load as
    /// [`DirectorySnapshot::empty`] — never an error for the caller.
    pub fn load(admin_dir: &Path) -> Self {
        let path = admin_dir.join(SNAPSHOT_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        serde_json::from_str(&content).unwrap_or_else(|_| Self::empty())
    }

    /// Write the snapshot into an administrative directory, replacing any
    /// previous record in full.
    pub fn save(&self, admin_dir: &Path) -> io::Result<()> {
        let path = admin_dir.join(SNAPSHOT_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Project this run's listing into the persisted representation.
    pub fn from_listing(listing: &DirectoryListing) -> Self {
        let files = listing
            .files
            .iter()
            .map(|(name, record)| {
                (
                    name.clone(),
                    FileState {
                        mtime: record.mtime,
                        preview_generated: record.preview_generated,
                        preview_exists: record.preview_exists,
                        preview_mtime: record.preview_mtime,
                        fingerprint: record.fingerprint.clone(),
                    },
                )
            })
            .collect();
        Self {
            dirs: listing.subdirs.clone(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> DirectorySnapshot {
        let mut files = BTreeMap::new();
        files.insert(
            "photo.jpg".to_string(),
            FileState {
                mtime: 1234.5,
                preview_generated: true,
                preview_exists: true,
                preview_mtime: 1300.0,
                fingerprint: None,
            },
        );
        DirectorySnapshot {
            dirs: vec!["a".into(), "b".into()],
            files,
        }
    }

    // =========================================================================
    // Load behavior — never fails
    // =========================================================================

    #[test]
    fn load_missing_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let snap = DirectorySnapshot::load(tmp.path());
        assert!(snap.is_empty());
    }

    #[test]
    fn load_corrupt_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SNAPSHOT_FILENAME), "{ not json").unwrap();
        let snap = DirectorySnapshot::load(tmp.path());
        assert!(snap.is_empty());
    }

    #[test]
    fn load_wrong_shape_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SNAPSHOT_FILENAME), r#"{"dirs": 42}"#).unwrap();
        let snap = DirectorySnapshot::load(tmp.path());
        assert!(snap.is_empty());
    }

    #[test]
    fn load_tolerates_missing_flags() {
        // Records written before the cache-outcome flags existed still load.
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SNAPSHOT_FILENAME),
            r#"{"dirs": [], "files": {"a.txt": {"mtime": 5.0}}}"#,
        )
        .unwrap();
        let snap = DirectorySnapshot::load(tmp.path());
        let state = &snap.files["a.txt"];
        assert_eq!(state.mtime, 5.0);
        assert!(!state.preview_generated);
        assert!(!state.preview_exists);
    }

    // =========================================================================
    // Save / roundtrip
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let snap = sample();
        snap.save(tmp.path()).unwrap();
        assert_eq!(DirectorySnapshot::load(tmp.path()), snap);
    }

    #[test]
    fn save_replaces_whole_record() {
        let tmp = TempDir::new().unwrap();
        sample().save(tmp.path()).unwrap();

        let replacement = DirectorySnapshot {
            dirs: vec!["only".into()],
            files: BTreeMap::new(),
        };
        replacement.save(tmp.path()).unwrap();

        let loaded = DirectorySnapshot::load(tmp.path());
        assert_eq!(loaded, replacement);
        assert!(!loaded.files.contains_key("photo.jpg"));
    }

    #[test]
    fn persisted_record_has_two_top_level_fields() {
        let tmp = TempDir::new().unwrap();
        sample().save(tmp.path()).unwrap();

        let raw = fs::read_to_string(tmp.path().join(SNAPSHOT_FILENAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("dirs"));
        assert!(obj.contains_key("files"));
    }

    #[test]
    fn fingerprint_omitted_when_absent() {
        let tmp = TempDir::new().unwrap();
        sample().save(tmp.path()).unwrap();
        let raw = fs::read_to_string(tmp.path().join(SNAPSHOT_FILENAME)).unwrap();
        assert!(!raw.contains("fingerprint"));
    }

    // =========================================================================
    // Projection from a listing
    // =========================================================================

    #[test]
    fn from_listing_projects_preview_state() {
        let mut listing = DirectoryListing::default();
        listing.subdirs = vec!["sub".into()];
        let mut record = FileRecord::new("f.txt".into(), "/tree/f.txt".into(), 10.0);
        record.preview_generated = true;
        record.preview_exists = false;
        listing.files.insert(record.name.clone(), record);

        let snap = DirectorySnapshot::from_listing(&listing);
        assert_eq!(snap.dirs, vec!["sub".to_string()]);
        let state = &snap.files["f.txt"];
        assert_eq!(state.mtime, 10.0);
        assert!(state.preview_generated);
        assert!(!state.preview_exists);
        assert_eq!(state.preview_mtime, 0.0);
    }
}
