//! ase-extract: per-layer, per-frame images out of Aseprite files.
//!
//! An `.ase`/`.aseprite` file is decoded into a [`doc::Document`], every
//! layer is composited separately for every frame, and each non-empty result
//! is written as `LL-FF.png` next to an `aseprite.json` sidecar describing
//! the document and the exported images.
//!
//! # Modules
//!
//! - [`doc`]: Binary decoder and document model
//! - [`render`]: Pixel expansion, compositing and bounding boxes
//! - [`extract`]: Per-layer, per-frame extraction and the metadata sidecar
//! - [`error`]: Error types for extraction operations

pub mod doc;
pub mod error;
pub mod extract;
pub mod render;

use std::path::PathBuf;

use clap::Parser;

pub use error::AseError;
pub use extract::{extract, extract_to_dir, ExtractOptions, ExtractReport, Input};

/// The ase CLI application.
#[derive(Parser)]
#[command(name = "ase")]
#[command(version, author, about)]
struct Cli {
    /// Aseprite file to extract (.ase or .aseprite).
    input: PathBuf,

    /// Directory the images and metadata are written to (created if missing).
    #[arg(short, long)]
    out_dir: PathBuf,

    /// Number of worker threads (defaults to one per core).
    #[arg(long, env = "ASE_THREADS")]
    threads: Option<usize>,

    /// File name of the metadata sidecar inside the output directory.
    #[arg(long, default_value = extract::DEFAULT_METADATA_NAME)]
    metadata_name: String,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Run the ase CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), AseError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = ExtractOptions {
        threads: cli.threads,
        metadata_name: cli.metadata_name,
    };
    let report = extract_to_dir(cli.input, &cli.out_dir, &opts)?;

    println!("Aseprite file extracted to {}", cli.out_dir.display());
    print!("{}", report);
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // Logs go to stderr so stdout stays the summary only.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
