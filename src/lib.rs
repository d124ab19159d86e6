//! # dirview
//!
//! Incrementally maintained browsable mirror of a directory tree. Every
//! directory gets a `dirview.html` listing its subdirectories and files,
//! each file accompanied by a cached preview image — and re-running the
//! tool only regenerates what actually changed since the previous run.
//!
//! # Architecture: Snapshot-Driven Incremental Walk
//!
//! ```text
//! walk ── per directory ──► classify entries (denylists, pruning)
//!                           ├─► recurse into subdirectories first
//!                           ├─► preview cache: reuse / regenerate / skip
//!                           ├─► change detector: listing vs snapshot
//!                           └─► on change only: rewrite snapshot + index
//! ```
//!
//! The engine's contract is correctness under partial and repeated runs:
//!
//! - **Idempotence**: a second run over an unchanged tree performs zero
//!   preview generations and zero index writes, and leaves every snapshot
//!   byte-identical.
//! - **Monotonic convergence**: after a targeted change, exactly the
//!   affected directories are redone — siblings stay untouched.
//! - **Containment**: nothing past argument validation aborts the run.
//!   Corrupt snapshots degrade to a first run, generator failures become
//!   recorded (and retry-suppressed) cache state, entries that vanish
//!   mid-run are skipped.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Depth-first tree walker, pruning, per-directory orchestration, `clean` |
//! | [`snapshot`] | Per-directory `snapshot.json` store — what the previous run saw |
//! | [`preview`] | Preview artifact cache and the [`preview::PreviewGenerator`] capability |
//! | [`detect`] | Pure change detection between snapshot and fresh listing |
//! | [`render`] | Maud-rendered `dirview.html` index artifacts |
//! | [`imaging`] | Pure-Rust thumbnail rendering for the builtin generator |
//! | [`config`] | `dirview.toml` settings and the explicit per-run configuration |
//! | [`output`] | Reporter narration and run summaries |
//! | [`types`] | `FileRecord` / `DirectoryListing` shared types |
//!
//! # Design Decisions
//!
//! ## Identity Is the Path, Not the Content
//!
//! A directory's state is keyed by entry names and modification times. This
//! keeps an unchanged run at one `stat` per entry — no hashing, no reads.
//! The documented blind spot (a file replaced with different bytes but an
//! identical name and mtime) can be closed with the opt-in
//! `[snapshot] fingerprint` setting, which trades a full content read per
//! file for exact detection.
//!
//! ## Artifact Presence Is the Only Generator Truth
//!
//! External preview tools are unreliable narrators: some exit nonzero for
//! file types they skip, some exit zero having produced nothing. So the
//! cache ignores exit status entirely and probes for the artifact instead.
//! An attempt that produced nothing is recorded in the snapshot and not
//! repeated until the source file changes.
//!
//! ## Maud Over Template Engines
//!
//! The index artifact is rendered with [Maud](https://maud.lambda.xyz/):
//! malformed HTML is a compile error, interpolation is auto-escaped (file
//! names are user input!), and there is no template directory to ship.
//!
//! ## One Writer Per Directory
//!
//! Directories are processed strictly depth-first. Within one directory,
//! preview generation fans out over files via rayon, but the snapshot and
//! index writes happen only after the fan-out completes — each directory's
//! administrative state has at most one writer at a time.

pub mod config;
pub mod detect;
pub mod imaging;
pub mod output;
pub mod preview;
pub mod render;
pub mod snapshot;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
