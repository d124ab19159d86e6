//! Run configuration.
//!
//! Two layers, both explicit — there is no ambient state:
//!
//! - [`Settings`]: the optional `dirview.toml` at the tree root. Sparse TOML,
//!   every field has a default, unknown keys are rejected to catch typos
//!   early.
//! - [`RunConfig`]: the resolved per-run value threaded through every
//!   component (walker, preview cache, change detector, renderer). Carries
//!   the effective denylists, the verbosity level, and the fingerprint flag.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [skip]
//! extra_dirs = []            # Directory names to skip, on top of the builtins
//! extra_files = []           # File names to skip, on top of the builtins
//!
//! [preview]
//! backend = "command"        # "command" (external tool) or "builtin" (pure Rust)
//! command = "qlmanage"       # External preview generator program
//! args = ["-t", "{source}", "-o", "{dest}"]
//! max_edge = 512             # Builtin backend: thumbnail size on the longer edge
//!
//! [snapshot]
//! fingerprint = false        # Also compare content hashes, not just mtimes
//!
//! [processing]
//! max_processes = 4          # Max parallel preview workers (omit for auto = CPU cores)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the administrative subtree inside each processed directory.
pub const ADMIN_DIRNAME: &str = ".dirview";

/// Name of the preview cache directory inside the administrative subtree.
pub const PREVIEWS_DIRNAME: &str = "previews";

/// Well-known name of the per-directory index artifact.
pub const INDEX_FILENAME: &str = "dirview.html";

/// Name of the optional config file at the tree root.
pub const CONFIG_FILENAME: &str = "dirview.toml";

/// Directory names never treated as content.
const DIRS_TO_SKIP: &[&str] = &[
    ADMIN_DIRNAME,
    ".git",
    ".svn",
    ".Trash",
    ".TemporaryItems",
    ".ssh",
    ".subversion",
    ".gnupg",
    ".bash_sessions",
    ".cache",
    ".credentials",
    ".cups",
    ".dropbox",
];

/// File names never treated as content. The tool's own artifacts must be
/// here or every run would see its previous output as new files.
const FILES_TO_SKIP: &[&str] = &[".DS_Store", INDEX_FILENAME, CONFIG_FILENAME];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `dirview.toml`.
///
/// All fields have defaults; user config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Extra denylist entries on top of the builtin skip lists.
    pub skip: SkipConfig,
    /// Preview generation settings.
    pub preview: PreviewConfig,
    /// Snapshot comparison settings.
    pub snapshot: SnapshotConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Settings {
    /// Validate config values before any work happens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.command.is_empty() {
            return Err(ConfigError::Validation(
                "preview.command must not be empty".into(),
            ));
        }
        if !self.preview.args.iter().any(|a| a.contains("{source}"))
            || !self.preview.args.iter().any(|a| a.contains("{dest}"))
        {
            return Err(ConfigError::Validation(
                "preview.args must contain both {source} and {dest} placeholders".into(),
            ));
        }
        if self.preview.max_edge == 0 {
            return Err(ConfigError::Validation(
                "preview.max_edge must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Extra denylist entries. Matching is by exact, case-sensitive name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipConfig {
    pub extra_dirs: Vec<String>,
    pub extra_files: Vec<String>,
}

/// Which preview generator runs, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// `command` spawns an external tool; `builtin` renders thumbnails
    /// in-process for common image formats.
    pub backend: PreviewBackend,
    /// External generator program (command backend).
    pub command: String,
    /// Argument template for the external generator. `{source}` and `{dest}`
    /// are replaced with the source file path and the cache directory.
    pub args: Vec<String>,
    /// Thumbnail size on the longer edge (builtin backend).
    pub max_edge: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            backend: PreviewBackend::Command,
            command: "qlmanage".to_string(),
            args: vec![
                "-t".to_string(),
                "{source}".to_string(),
                "-o".to_string(),
                "{dest}".to_string(),
            ],
            max_edge: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBackend {
    Command,
    Builtin,
}

/// Snapshot comparison settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// When true, snapshots also record a content hash per file and change
    /// detection compares it. Catches a file replaced with different content
    /// but an identical name and modification time, at the cost of reading
    /// every file each run.
    pub fingerprint: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel preview workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load settings from `<root>/dirview.toml`, or defaults if it is absent.
pub fn load_settings(root: &Path) -> Result<Settings, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    let settings = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}

/// How much the run narrates. Debug implies verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    #[default]
    Quiet,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    pub fn is_verbose(self) -> bool {
        self >= Verbosity::Verbose
    }

    pub fn is_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// The resolved configuration for one run, threaded through every component.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub verbosity: Verbosity,
    pub skip_dirs: BTreeSet<String>,
    pub skip_files: BTreeSet<String>,
    pub fingerprint: bool,
}

impl RunConfig {
    /// Merge the builtin denylists with the config file's extras.
    pub fn new(settings: &Settings, verbosity: Verbosity) -> Self {
        let mut skip_dirs: BTreeSet<String> = DIRS_TO_SKIP.iter().map(|s| s.to_string()).collect();
        skip_dirs.extend(settings.skip.extra_dirs.iter().cloned());

        let mut skip_files: BTreeSet<String> =
            FILES_TO_SKIP.iter().map(|s| s.to_string()).collect();
        skip_files.extend(settings.skip.extra_files.iter().cloned());

        Self {
            verbosity,
            skip_dirs,
            skip_files,
            fingerprint: settings.snapshot.fingerprint,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(&Settings::default(), Verbosity::Quiet)
    }
}

/// A documented stock `dirview.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# dirview configuration. Place this file at the root of the tree you
# process; it is skipped like any other administrative file.
# All options are optional - defaults shown below.

[skip]
# Directory and file names to skip, on top of the builtin lists
# (.git, .svn, .cache, ..., and .DS_Store, dirview.html, dirview.toml).
# Matching is by exact, case-sensitive name.
extra_dirs = []
extra_files = []

[preview]
# "command" spawns the external generator below; "builtin" renders
# thumbnails in-process for JPEG, PNG, TIFF and WebP sources.
backend = "command"
command = "qlmanage"
args = ["-t", "{source}", "-o", "{dest}"]
# Builtin backend only: thumbnail size on the longer edge, in pixels.
max_edge = 512

[snapshot]
# Also record and compare a content hash per file. Catches a file replaced
# with different content but an identical name and modification time, at
# the cost of reading every file each run.
fingerprint = false

[processing]
# Max parallel preview workers. Omit for auto (one per CPU core).
#max_processes = 4
"#
}
