//! `attrib` - Third-Party License Attribution Bundler.
//!
//! Reads a resolved dependency list, determines license text for each
//! dependency (package metadata or bundled sub-archives), and writes a
//! concatenated license blob plus a byte-range index next to it.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use attrib_core::Aggregator;
use attrib_core::metadata::DirMetadataSource;
use attrib_core::types::load_dependency_list;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// File name of the aggregated license-text blob.
const LICENSES_FILE: &str = "third_party_licenses";
/// File name of the byte-range index.
const METADATA_FILE: &str = "third_party_license_metadata";

#[derive(Parser)]
#[command(name = "attrib")]
#[command(about = "Bundles third-party license attributions for a resolved dependency graph", long_about = None)]
struct Cli {
    /// Resolved dependency list (JSON) produced by the build's resolution step
    #[arg(long)]
    dependencies: PathBuf,

    /// Directory of package metadata documents (<group>/<name>/<version>.toml)
    #[arg(long)]
    metadata_dir: PathBuf,

    /// Output directory for the blob and index files
    #[arg(short, long, default_value = "third-party")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let deps = load_dependency_list(&cli.dependencies)?;

    // Output paths must be writable before any extraction work happens;
    // both files are truncated and rewritten on every run.
    std::fs::create_dir_all(&cli.out_dir).with_context(|| {
        format!("Failed to create output directory {}", cli.out_dir.display())
    })?;
    let blob_path = cli.out_dir.join(LICENSES_FILE);
    let blob = File::create(&blob_path)
        .with_context(|| format!("Failed to create {}", blob_path.display()))?;
    let index_path = cli.out_dir.join(METADATA_FILE);
    let mut index_out = File::create(&index_path)
        .with_context(|| format!("Failed to create {}", index_path.display()))?;

    let source = DirMetadataSource::new(cli.metadata_dir);
    let mut aggregator = Aggregator::new(BufWriter::new(blob));
    aggregator.run(&deps, &source)?;
    let (_, index) = aggregator.finish().context("Failed to finalize license blob")?;
    index
        .write_to(&mut index_out)
        .context("Failed to write license index")?;

    println!("  {} dependencies scanned", deps.len());
    println!("  {} licenses -> {}", index.len(), blob_path.display());

    Ok(())
}
