//! Tree walking and per-directory orchestration.
//!
//! The walker visits directories strictly depth-first, and for each one:
//!
//! 1. Lists and classifies entries against the denylists (administrative
//!    directories, noise files), skipping anything that vanishes mid-scan.
//! 2. Prunes: a directory with no real content left has its administrative
//!    subtree (and stale index) removed and is not descended into.
//! 3. Recurses into subdirectories *before* touching this directory's own
//!    files and metadata, so child indexes are settled first.
//! 4. Runs the preview cache over the directory's files — fanned out with
//!    rayon behind the [`PreviewGenerator`] capability.
//! 5. Asks the change detector whether anything differs from the snapshot;
//!    only then rewrites the snapshot and the index artifact. An unchanged
//!    directory performs zero writes, which is what makes repeated runs
//!    byte-identical.
//!
//! The snapshot write happens after every one of the directory's preview
//! generations has completed, so each directory's administrative state has
//! exactly one writer at a time.
//!
//! Symbolic-link cycles are broken by a stack of canonicalized paths: a
//! directory already on the recursion stack is reported and skipped, never
//! revisited.

use crate::config::{ADMIN_DIRNAME, INDEX_FILENAME, PREVIEWS_DIRNAME, RunConfig};
use crate::detect;
use crate::output::Reporter;
use crate::preview::{self, PreviewGenerator, PreviewOutcome};
use crate::render;
use crate::snapshot::DirectorySnapshot;
use crate::types::{DirectoryListing, FileRecord, mtime_seconds};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-preview outcome counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PreviewStats {
    pub up_to_date: u32,
    pub generated: u32,
    pub skipped: u32,
    pub no_artifact: u32,
}

impl PreviewStats {
    fn record(&mut self, outcome: PreviewOutcome) {
        match outcome {
            PreviewOutcome::UpToDate => self.up_to_date += 1,
            PreviewOutcome::Generated => self.generated += 1,
            PreviewOutcome::Skipped => self.skipped += 1,
            PreviewOutcome::NoArtifact => self.no_artifact += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.up_to_date + self.generated + self.skipped + self.no_artifact
    }
}

impl fmt::Display for PreviewStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "none");
        }
        write!(f, "{} current, {} generated", self.up_to_date, self.generated)?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        if self.no_artifact > 0 {
            write!(f, ", {} produced nothing", self.no_artifact)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// What one run did, for narration and for asserting the zero-work
/// properties in tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub dirs_visited: u32,
    pub dirs_pruned: u32,
    pub cycles_skipped: u32,
    pub indexes_written: u32,
    pub previews: PreviewStats,
}

/// Depth-first walker over one tree.
pub struct Walker<'a, G: PreviewGenerator + ?Sized> {
    config: &'a RunConfig,
    generator: &'a G,
    reporter: Reporter,
    stats: WalkStats,
    /// Canonicalized paths currently on the recursion stack.
    visiting: Vec<PathBuf>,
}

impl<'a, G: PreviewGenerator + ?Sized> Walker<'a, G> {
    pub fn new(config: &'a RunConfig, generator: &'a G, reporter: Reporter) -> Self {
        Self {
            config,
            generator,
            reporter,
            stats: WalkStats::default(),
            visiting: Vec::new(),
        }
    }

    /// Process the whole tree under `root` and return what happened.
    pub fn walk(mut self, root: &Path) -> WalkStats {
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        self.process_dir(&root, true);
        self.stats
    }

    fn process_dir(&mut self, dir: &Path, is_root: bool) {
        let real = match fs::canonicalize(dir) {
            Ok(p) => p,
            Err(_) => {
                // Deleted between listing and descent.
                self.reporter
                    .debug(format!("   {} vanished -- skipping", dir.display()));
                return;
            }
        };
        if self.visiting.contains(&real) {
            self.reporter.warn(format!(
                "symlink cycle at {} -- skipping subtree",
                dir.display()
            ));
            self.stats.cycles_skipped += 1;
            return;
        }

        self.visiting.push(real);
        self.process_dir_contents(dir, is_root);
        self.visiting.pop();
    }

    fn process_dir_contents(&mut self, dir: &Path, is_root: bool) {
        self.reporter
            .verbose(format!("Processing dir {}", dir.display()));

        let names = match read_entry_names(dir) {
            Some(names) => names,
            None => {
                self.reporter
                    .debug(format!("   Directory {} vanished -- skipping", dir.display()));
                return;
            }
        };
        if names.is_empty() {
            self.reporter
                .debug(format!("   Directory {} is empty -- skipping", dir.display()));
            return;
        }

        let mut listing = self.classify(dir, &names);
        if listing.is_empty() {
            // Content was deleted since the last run; don't let its caches
            // linger.
            self.prune(dir);
            return;
        }

        self.stats.dirs_visited += 1;

        let admin_dir = dir.join(ADMIN_DIRNAME);
        if let Err(e) = fs::create_dir_all(&admin_dir) {
            self.reporter
                .warn(format!("cannot create {}: {e}", admin_dir.display()));
            return;
        }
        let prior = DirectorySnapshot::load(&admin_dir);

        // Children settle before this directory's own files and metadata.
        for name in &listing.subdirs {
            self.process_dir(&dir.join(name), false);
        }

        if !listing.files.is_empty() {
            self.populate_previews(&admin_dir, &prior, &mut listing);
        }

        if detect::changed(&prior, &listing, &self.reporter) {
            if let Err(e) = DirectorySnapshot::from_listing(&listing).save(&admin_dir) {
                self.reporter
                    .warn(format!("cannot write snapshot in {}: {e}", dir.display()));
            }
            match render::write_index(dir, &listing, !is_root) {
                Ok(()) => {
                    self.stats.indexes_written += 1;
                    self.reporter
                        .verbose(format!("   Wrote {}", dir.join(INDEX_FILENAME).display()));
                }
                Err(e) => self
                    .reporter
                    .warn(format!("cannot write index in {}: {e}", dir.display())),
            }
        } else {
            self.reporter
                .debug(format!("   {} unchanged -- nothing to write", dir.display()));
        }
    }

    /// Sorted entry classification against the denylists.
    fn classify(&self, dir: &Path, names: &[String]) -> DirectoryListing {
        self.reporter
            .debug(format!("   Examining contents of directory {}", dir.display()));

        let mut listing = DirectoryListing::default();
        for name in names {
            let path = dir.join(name);
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => {
                    // Raced with an external deletion; not our problem.
                    self.reporter
                        .debug(format!("      {name} vanished -- skipping"));
                    continue;
                }
            };

            if metadata.is_dir() {
                if self.config.skip_dirs.contains(name) {
                    self.reporter
                        .debug(format!("      NOT adding subdirectory {name}"));
                } else {
                    self.reporter.debug(format!("      Adding subdirectory {name}"));
                    listing.subdirs.push(name.clone());
                }
            } else if self.config.skip_files.contains(name) {
                self.reporter.debug(format!("      NOT adding file {name}"));
            } else {
                self.reporter.debug(format!("      Adding file {name}"));
                let mtime = metadata.modified().map(mtime_seconds).unwrap_or(0.0);
                let mut record = FileRecord::new(name.clone(), path.clone(), mtime);
                if self.config.fingerprint {
                    record.fingerprint = hash_file(&path).ok();
                }
                listing.files.insert(name.clone(), record);
            }
        }
        listing.subdirs.sort();
        listing
    }

    /// Run the preview cache over every file, fanned out across the
    /// directory's files. The caller writes the snapshot only after this
    /// returns, so the fan-out never races the directory's metadata.
    fn populate_previews(
        &mut self,
        admin_dir: &Path,
        prior: &DirectorySnapshot,
        listing: &mut DirectoryListing,
    ) {
        let preview_dir = admin_dir.join(PREVIEWS_DIRNAME);
        if let Err(e) = fs::create_dir_all(&preview_dir) {
            self.reporter
                .warn(format!("cannot create {}: {e}", preview_dir.display()));
            return;
        }

        let generator = self.generator;
        let reporter = self.reporter;
        let outcomes: Vec<PreviewOutcome> = listing
            .files
            .par_iter_mut()
            .map(|(name, record)| {
                preview::ensure_preview(
                    record,
                    &preview_dir,
                    prior.files.get(name),
                    generator,
                    &reporter,
                )
            })
            .collect();

        for outcome in outcomes {
            self.stats.previews.record(outcome);
        }
    }

    /// Remove the administrative subtree (and the stale index artifact) of a
    /// directory that no longer holds real content. Everything else in the
    /// directory is left untouched.
    fn prune(&mut self, dir: &Path) {
        let mut removed = false;

        let admin_dir = dir.join(ADMIN_DIRNAME);
        if admin_dir.is_dir() {
            self.reporter
                .debug(format!("   Directory {} is now empty -- pruning", dir.display()));
            if fs::remove_dir_all(&admin_dir).is_ok() {
                removed = true;
            }
        }
        let index = dir.join(INDEX_FILENAME);
        if index.is_file() && fs::remove_file(&index).is_ok() {
            removed = true;
        }

        if removed {
            self.stats.dirs_pruned += 1;
        }
    }
}

/// Entry names of a directory, sorted for deterministic processing order.
/// `None` when the directory cannot be listed (typically: it vanished).
/// Names that are not valid UTF-8 are skipped — identity here is textual.
fn read_entry_names(dir: &Path) -> Option<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    Some(names)
}

/// SHA-256 hash of a file's contents, returned as a hex string.
fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{digest:x}"))
}

/// Remove every administrative subtree and index artifact under `root`.
/// Returns how many entries were removed.
pub fn clean(root: &Path, reporter: &Reporter) -> usize {
    let mut removed = 0;
    let mut entries = WalkDir::new(root).into_iter();
    while let Some(entry) = entries.next() {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_str();

        if entry.file_type().is_dir() && name == Some(ADMIN_DIRNAME) {
            reporter.verbose(format!("Removing {}", entry.path().display()));
            if fs::remove_dir_all(entry.path()).is_ok() {
                removed += 1;
            }
            entries.skip_current_dir();
        } else if entry.file_type().is_file() && name == Some(INDEX_FILENAME) {
            reporter.verbose(format!("Removing {}", entry.path().display()));
            if fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::tests::MockGenerator;
    use crate::test_helpers::{set_file_mtime, shift_mtime};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn run_walk(root: &Path, generator: &MockGenerator) -> WalkStats {
        let config = RunConfig::default();
        Walker::new(&config, generator, Reporter::default()).walk(root)
    }

    fn snapshot_path(dir: &Path) -> PathBuf {
        dir.join(ADMIN_DIRNAME).join(crate::snapshot::SNAPSHOT_FILENAME)
    }

    // =========================================================================
    // Basic walk behavior
    // =========================================================================

    #[test]
    fn first_run_builds_index_snapshot_and_previews() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), b"b").unwrap();

        let generator = MockGenerator::producing();
        let stats = run_walk(tmp.path(), &generator);

        assert_eq!(stats.dirs_visited, 2);
        assert_eq!(stats.indexes_written, 2);
        assert_eq!(stats.previews.generated, 2);
        assert!(tmp.path().join(INDEX_FILENAME).exists());
        assert!(tmp.path().join("sub").join(INDEX_FILENAME).exists());
        assert!(snapshot_path(tmp.path()).exists());
        assert!(
            tmp.path()
                .join(ADMIN_DIRNAME)
                .join(PREVIEWS_DIRNAME)
                .join("a.txt.png")
                .exists()
        );
    }

    #[test]
    fn empty_root_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let generator = MockGenerator::producing();
        let stats = run_walk(tmp.path(), &generator);

        assert_eq!(stats, WalkStats::default());
        assert!(!tmp.path().join(ADMIN_DIRNAME).exists());
    }

    #[test]
    fn administrative_entries_are_not_content() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join(".DS_Store"), b"junk").unwrap();

        let generator = MockGenerator::producing();
        run_walk(tmp.path(), &generator);

        let html = std::fs::read_to_string(tmp.path().join(INDEX_FILENAME)).unwrap();
        assert!(html.contains("a.txt"));
        assert!(!html.contains(".git"));
        assert!(!html.contains(".DS_Store"));
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[test]
    fn second_run_on_unchanged_tree_does_no_work() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), b"b").unwrap();

        let generator = MockGenerator::producing();
        run_walk(tmp.path(), &generator);
        let first_snapshot = std::fs::read(snapshot_path(tmp.path())).unwrap();

        let second = run_walk(tmp.path(), &MockGenerator::producing());

        assert_eq!(second.previews.generated, 0);
        assert_eq!(second.previews.no_artifact, 0);
        assert_eq!(second.indexes_written, 0);
        assert_eq!(second.previews.up_to_date, 2);

        let second_snapshot = std::fs::read(snapshot_path(tmp.path())).unwrap();
        assert_eq!(first_snapshot, second_snapshot);
    }

    #[test]
    fn unsupported_files_are_not_retried_on_second_run() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("weird.bin"), b"data").unwrap();

        run_walk(tmp.path(), &MockGenerator::barren());

        let generator = MockGenerator::barren();
        let second = run_walk(tmp.path(), &generator);
        assert_eq!(generator.call_count(), 0);
        assert_eq!(second.previews.skipped, 1);
        assert_eq!(second.indexes_written, 0);
    }

    // =========================================================================
    // Monotonic convergence
    // =========================================================================

    #[test]
    fn touching_one_file_reindexes_only_its_directory() {
        let tmp = TempDir::new().unwrap();
        for sub in ["left", "right"] {
            std::fs::create_dir(tmp.path().join(sub)).unwrap();
            std::fs::write(tmp.path().join(sub).join("f.txt"), b"x").unwrap();
        }

        run_walk(tmp.path(), &MockGenerator::producing());

        // Make left/f.txt newer than its preview artifact.
        shift_mtime(&tmp.path().join("left/f.txt"), Duration::from_secs(60));

        let second = run_walk(tmp.path(), &MockGenerator::producing());
        assert_eq!(second.previews.generated, 1);
        assert_eq!(second.indexes_written, 1);
    }

    #[test]
    fn stale_preview_regenerated_exactly_once() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("doc.txt"), b"v1").unwrap();

        run_walk(tmp.path(), &MockGenerator::producing());

        // Age the artifact behind the source.
        let artifact = tmp
            .path()
            .join(ADMIN_DIRNAME)
            .join(PREVIEWS_DIRNAME)
            .join("doc.txt.png");
        set_file_mtime(&artifact, SystemTime::UNIX_EPOCH + Duration::from_secs(1));

        let generator = MockGenerator::producing();
        let second = run_walk(tmp.path(), &generator);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(second.previews.generated, 1);

        // And the run after that is quiet again.
        let third = run_walk(tmp.path(), &MockGenerator::producing());
        assert_eq!(third.previews.generated, 0);
        assert_eq!(third.indexes_written, 0);
    }

    // =========================================================================
    // Pruning
    // =========================================================================

    #[test]
    fn emptied_directory_loses_its_administrative_subtree() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), b"x").unwrap();

        run_walk(tmp.path(), &MockGenerator::producing());
        assert!(sub.join(ADMIN_DIRNAME).exists());

        std::fs::remove_file(sub.join("f.txt")).unwrap();
        let second = run_walk(tmp.path(), &MockGenerator::producing());

        assert_eq!(second.dirs_pruned, 1);
        assert!(!sub.join(ADMIN_DIRNAME).exists());
        assert!(!sub.join(INDEX_FILENAME).exists());
        // The directory itself survives.
        assert!(sub.is_dir());
        // And the parent noticed the subdirectory still exists, unchanged.
        assert!(tmp.path().join(INDEX_FILENAME).exists());
    }

    #[test]
    fn noise_files_do_not_block_pruning() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), b"x").unwrap();

        run_walk(tmp.path(), &MockGenerator::producing());

        std::fs::remove_file(sub.join("f.txt")).unwrap();
        std::fs::write(sub.join(".DS_Store"), b"junk").unwrap();
        let second = run_walk(tmp.path(), &MockGenerator::producing());

        assert_eq!(second.dirs_pruned, 1);
        assert!(!sub.join(ADMIN_DIRNAME).exists());
        // Noise files are left alone.
        assert!(sub.join(".DS_Store").exists());
    }

    // =========================================================================
    // Symlink cycles
    // =========================================================================

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_skipped_not_followed() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(tmp.path(), sub.join("loop")).unwrap();

        let stats = run_walk(tmp.path(), &MockGenerator::producing());
        assert_eq!(stats.cycles_skipped, 1);
        // The rest of the tree still processed.
        assert!(sub.join(INDEX_FILENAME).exists());
    }

    // =========================================================================
    // Fingerprint mode
    // =========================================================================

    #[test]
    fn fingerprint_mode_detects_same_mtime_replacement() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("doc.txt");
        std::fs::write(&file, b"version one").unwrap();
        let original_mtime = std::fs::metadata(&file).unwrap().modified().unwrap();

        let mut config = RunConfig::default();
        config.fingerprint = true;

        let generator = MockGenerator::producing();
        Walker::new(&config, &generator, Reporter::default()).walk(tmp.path());

        // Replace content, then force the mtime back to the original value.
        std::fs::write(&file, b"version two").unwrap();
        set_file_mtime(&file, original_mtime);
        // Keep the artifact newer than the source so the preview cache
        // stays quiet and only the fingerprint can signal change.
        let artifact = tmp
            .path()
            .join(ADMIN_DIRNAME)
            .join(PREVIEWS_DIRNAME)
            .join("doc.txt.png");
        set_file_mtime(&artifact, SystemTime::now() + Duration::from_secs(60));

        let second =
            Walker::new(&config, &MockGenerator::producing(), Reporter::default()).walk(tmp.path());
        assert_eq!(second.indexes_written, 1);

        // Without fingerprinting the same change goes unnoticed.
        let plain = RunConfig::default();
        std::fs::write(&file, b"version three").unwrap();
        set_file_mtime(&file, original_mtime);
        let third =
            Walker::new(&plain, &MockGenerator::producing(), Reporter::default()).walk(tmp.path());
        assert_eq!(third.indexes_written, 0);
    }

    // =========================================================================
    // Clean
    // =========================================================================

    #[test]
    fn clean_scrubs_all_administrative_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), b"b").unwrap();

        run_walk(tmp.path(), &MockGenerator::producing());
        let removed = clean(tmp.path(), &Reporter::default());

        assert_eq!(removed, 4); // two admin subtrees, two indexes
        assert!(!tmp.path().join(ADMIN_DIRNAME).exists());
        assert!(!tmp.path().join(INDEX_FILENAME).exists());
        assert!(!tmp.path().join("sub").join(ADMIN_DIRNAME).exists());
        // User content untouched.
        assert!(tmp.path().join("a.txt").exists());
        assert!(tmp.path().join("sub/b.txt").exists());
    }
}
