//! Preview artifact cache.
//!
//! For one file, decide whether a preview artifact exists, is stale, or must
//! be (re)generated — and record the outcome so the next run can skip work.
//! Generation never fails the run: a generator that produces nothing (the
//! file type is unsupported, the tool crashed, the tool is not installed)
//! is recorded as "attempted, no artifact" and not retried until the source
//! changes.
//!
//! # Decision policy
//!
//! 1. Artifact present and at least as new as the source → reuse it.
//! 2. Artifact present but older than the source → stale, regenerate.
//! 3. Artifact absent, prior run attempted and produced nothing, source
//!    unchanged since → skip, don't pay for the same failure again.
//! 4. Otherwise → generate, then probe the expected path. Presence is the
//!    only authority; the generator's own exit status is ignored.
//!
//! # Generators
//!
//! Generation happens behind the [`PreviewGenerator`] capability so the
//! walker can fan out across a directory's files with rayon regardless of
//! what actually renders the preview:
//!
//! - [`CommandGenerator`] spawns an external tool (`qlmanage` by default),
//!   discarding its output unless debug narration is on.
//! - [`BuiltinGenerator`] renders thumbnails in-process via [`crate::imaging`].

use crate::config::{PreviewBackend, PreviewConfig, Verbosity};
use crate::imaging;
use crate::output::Reporter;
use crate::snapshot::FileState;
use crate::types::{FileRecord, mtime_seconds};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Extension appended to the full source file name to form the artifact
/// name: `photo.jpg` → `photo.jpg.png`.
pub const PREVIEW_EXTENSION: &str = "png";

/// Deterministic artifact path for a source file name.
pub fn preview_path(preview_dir: &Path, file_name: &str) -> PathBuf {
    preview_dir.join(format!("{file_name}.{PREVIEW_EXTENSION}"))
}

/// What [`ensure_preview`] did for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The existing artifact is current; nothing ran.
    UpToDate,
    /// A generation attempt ran and left an artifact.
    Generated,
    /// Known-unsupported from a prior run; no attempt made.
    Skipped,
    /// A generation attempt ran and produced nothing.
    NoArtifact,
}

/// Capability interface for whatever renders previews.
///
/// `Sync` so sibling files can generate in parallel. Returns whether the
/// attempt could be carried out at all (tool spawned, decoder ran); whether
/// an artifact resulted is judged separately by probing the filesystem.
pub trait PreviewGenerator: Sync {
    fn generate(&self, source: &Path, dest_dir: &Path) -> bool;
}

/// External-tool generator.
///
/// Invoked with the source file's absolute path and the destination cache
/// directory substituted into the configured argument template. The tool's
/// stdout/stderr are discarded unless debug narration is active, and its
/// exit status is not consulted — some generators exit nonzero for file
/// types they skip while still succeeding for others.
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    show_diagnostics: bool,
}

impl CommandGenerator {
    pub fn new(config: &PreviewConfig, verbosity: Verbosity) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            show_diagnostics: verbosity.is_debug(),
        }
    }
}

impl PreviewGenerator for CommandGenerator {
    fn generate(&self, source: &Path, dest_dir: &Path) -> bool {
        let mut cmd = Command::new(&self.program);
        for template in &self.args {
            let arg = template
                .replace("{source}", &source.to_string_lossy())
                .replace("{dest}", &dest_dir.to_string_lossy());
            cmd.arg(arg);
        }
        if !self.show_diagnostics {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd.status().is_ok()
    }
}

/// In-process generator using the pure-Rust imaging pipeline.
///
/// Declines anything outside the compiled-in decoder set, which flows into
/// the cache as a known-unsupported outcome exactly like an external tool
/// that produced nothing.
pub struct BuiltinGenerator {
    max_edge: u32,
}

impl BuiltinGenerator {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            max_edge: config.max_edge,
        }
    }
}

impl PreviewGenerator for BuiltinGenerator {
    fn generate(&self, source: &Path, dest_dir: &Path) -> bool {
        if !imaging::is_supported_input(source) {
            return false;
        }
        let Some(name) = source.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let dest = preview_path(dest_dir, name);
        imaging::render_thumbnail(source, &dest, self.max_edge).is_ok()
    }
}

/// Build the configured generator.
pub fn generator_from_config(
    config: &PreviewConfig,
    verbosity: Verbosity,
) -> Box<dyn PreviewGenerator> {
    match config.backend {
        PreviewBackend::Command => Box::new(CommandGenerator::new(config, verbosity)),
        PreviewBackend::Builtin => Box::new(BuiltinGenerator::new(config)),
    }
}

/// Fill in a record's preview fields, (re)generating the artifact when the
/// decision policy calls for it. Never fails the run.
pub fn ensure_preview<G: PreviewGenerator + ?Sized>(
    record: &mut FileRecord,
    preview_dir: &Path,
    prior: Option<&FileState>,
    generator: &G,
    reporter: &Reporter,
) -> PreviewOutcome {
    record.preview_path = preview_path(preview_dir, &record.name);

    match fs::metadata(&record.preview_path) {
        Ok(meta) => {
            let artifact_mtime = meta.modified().map(mtime_seconds).unwrap_or(0.0);
            if artifact_mtime >= record.mtime {
                record.preview_exists = true;
                record.preview_mtime = artifact_mtime;
                return PreviewOutcome::UpToDate;
            }
            // Source is newer than its artifact: fall through to regenerate.
            reporter.debug(format!("   Preview for {} is stale", record.name));
        }
        Err(_) => {
            if prior_attempt_still_applies(record, prior) {
                // Carry the recorded outcome forward so a snapshot rewrite
                // keeps suppressing retries for this file.
                record.preview_generated = true;
                record.preview_exists = false;
                record.preview_mtime = 0.0;
                reporter.debug(format!(
                    "   No preview for {} last time either -- not retrying",
                    record.name
                ));
                return PreviewOutcome::Skipped;
            }
        }
    }

    reporter.debug(format!("   Generating preview for {}", record.name));
    generator.generate(&record.abs_path, preview_dir);
    record.preview_generated = true;

    // The generator's word counts for nothing: probe for the artifact.
    match fs::metadata(&record.preview_path) {
        Ok(meta) => {
            record.preview_exists = true;
            record.preview_mtime = meta.modified().map(mtime_seconds).unwrap_or(0.0);
            PreviewOutcome::Generated
        }
        Err(_) => {
            record.preview_exists = false;
            record.preview_mtime = 0.0;
            PreviewOutcome::NoArtifact
        }
    }
}

/// Rule 3: the prior run attempted generation, got nothing, and the source
/// has not changed since — so another attempt would fail the same way.
fn prior_attempt_still_applies(record: &FileRecord, prior: Option<&FileState>) -> bool {
    let Some(state) = prior else {
        return false;
    };
    if !state.preview_generated || state.preview_exists {
        return false;
    }
    if state.mtime != record.mtime {
        // The file changed; it may have become convertible.
        return false;
    }
    match (&record.fingerprint, &state.fingerprint) {
        (Some(current), Some(previous)) => current == previous,
        _ => true,
    }
}
