use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quarry::index::builder::{IndexBuilder, IndexBuilderConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Builds the full inverted index, lexicon and document table from the
/// passage collection under the resources directory.
#[derive(Debug, Parser)]
#[command(name = "build_full_index")]
struct Args {
    /// Directory holding the collection and receiving the index artifacts.
    #[arg(long, env = "RESOURCES_PATH", default_value = "resources")]
    resources: PathBuf,

    /// Collection file (TSV, optionally gzip-compressed). Relative paths are
    /// resolved against the resources directory.
    #[arg(long, default_value = "collection.tsv.gz")]
    collection: PathBuf,

    /// Fixed number of documents per chunk, bypassing the memory profiler.
    #[arg(long)]
    static_chunk_size: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let collection = if args.collection.is_absolute() {
        args.collection.clone()
    } else {
        args.resources.join(&args.collection)
    };

    let mut config = IndexBuilderConfig::new(&args.resources, collection);
    config.static_chunk_size = args.static_chunk_size;

    match IndexBuilder::new(config).build_full_index() {
        Ok(stats) => {
            info!(
                documents = stats.documents,
                terms = stats.terms,
                partial_indexes = stats.partial_indexes,
                elapsed_seconds = stats.elapsed_seconds,
                "build finished"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "index build failed");
            ExitCode::FAILURE
        }
    }
}
