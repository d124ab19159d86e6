use clap::{Parser, Subcommand};
use dirview::{config, output, preview, walk};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dirview")]
#[command(about = "Browsable HTML mirror of a directory tree, maintained incrementally")]
#[command(long_about = "\
Browsable HTML mirror of a directory tree, maintained incrementally

Every directory gets a dirview.html listing its subdirectories and files,
each file with a cached preview image. Re-running only regenerates what
changed since the previous run; an unchanged tree is a no-op.

State layout (per directory):

  some/dir/
  ├── dirview.html                 # Index artifact (rewritten on change)
  └── .dirview/                    # Administrative subtree (tool-owned)
      ├── snapshot.json            # What the previous run saw here
      └── previews/
          └── photo.jpg.png        # One preview per file

Previews come from an external generator (qlmanage by default) or the
builtin pure-Rust thumbnailer; see 'dirview gen-config'. A directory whose
content is deleted has its administrative state pruned on the next run.

Run 'dirview gen-config' to generate a documented dirview.toml.")]
#[command(version)]
struct Cli {
    /// Directory tree to process
    #[arg(long, default_value = ".", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the tree, regenerating indexes and previews for what changed
    Run {
        /// Progress narration (one line per directory)
        #[arg(long)]
        verbose: bool,

        /// Diagnostic narration: classification, change reasoning,
        /// generator output (implies --verbose)
        #[arg(long)]
        debug: bool,
    },
    /// Remove all administrative state (snapshots, previews, indexes)
    Clean,
    /// Print a stock dirview.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { verbose, debug } => {
            let root = require_directory(&cli.dir);
            let settings = config::load_settings(&root)?;
            init_thread_pool(&settings.processing);

            let verbosity = config::Verbosity::from_flags(verbose, debug);
            let reporter = output::Reporter::new(verbosity);
            let run_config = config::RunConfig::new(&settings, verbosity);
            let generator = preview::generator_from_config(&settings.preview, verbosity);

            let stats = walk::Walker::new(&run_config, generator.as_ref(), reporter).walk(&root);
            output::print_summary(&stats);
        }
        Command::Clean => {
            let root = require_directory(&cli.dir);
            let reporter = output::Reporter::new(config::Verbosity::Verbose);
            let removed = walk::clean(&root, &reporter);
            println!(
                "Removed {removed} administrative entries under {}",
                root.display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// The target must exist and be a directory, else the run aborts before
/// doing any work.
fn require_directory(dir: &Path) -> PathBuf {
    if !dir.is_dir() {
        eprintln!(
            "Must supply a directory ('{}' is not a directory)",
            dir.display()
        );
        std::process::exit(1);
    }
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Initialize the rayon thread pool for preview fan-out.
///
/// Caps at the number of available CPU cores — user can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
