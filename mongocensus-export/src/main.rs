//! MongoDB cluster inventory export tool.
//!
//! Connects to a cluster and emits one of three structured exports:
//! a flat index list, the full metadata tree, or per-collection document
//! samples. Structured output goes to stdout (or `--output`); all
//! diagnostics and the human-readable summary go to stderr so the
//! structured stream is never contaminated.

use clap::{Args, Parser, Subcommand};
use mongocensus_core::error::CensusError;
use mongocensus_core::{DEFAULT_SAMPLE_SIZE, Result, emit, init_logging, redact_database_url};
use mongodb::Client;
use mongodb::bson::doc;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mongocensus-export")]
#[command(about = "MongoDB cluster inventory export tool")]
#[command(version)]
#[command(long_about = "
mongocensus-export - portable snapshots of a MongoDB cluster's shape

Walks every user database and collection on a cluster and emits structural
metadata for downstream compatibility analysis. All database operations are
read-only.

EXPORT MODES:
  indexes    Flat list of every index definition as one JSON document
  metadata   Full cluster/database/collection metadata tree as JSON
  samples    Random document samples per collection, strict Extended JSON,
             in a line-oriented block stream a post-processor can split
             into one file per collection

EXAMPLES:
  mongocensus-export --url mongodb://localhost:27017 indexes > indexes.json
  mongocensus-export --url mongodb://localhost:27017 metadata -o meta.json
  mongocensus-export --url mongodb://localhost:27017 samples --sample-size 25
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,

    /// Cluster connection string
    #[arg(
        long,
        env = "MONGODB_URI",
        help = "MongoDB connection string (credentials are sanitized in logs)"
    )]
    url: String,

    /// Output file path (defaults to stdout)
    #[arg(short, long, help = "Write structured output to a file instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Export a flat list of every index on the cluster
    Indexes,
    /// Export the full cluster metadata tree
    Metadata,
    /// Export per-collection document samples
    Samples(SampleArgs),
}

#[derive(Args)]
struct SampleArgs {
    /// Documents to sample per collection
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: u32,

    /// Directory name used in the per-collection block markers.
    /// No directory is created; a post-processor splits the stream.
    #[arg(long, default_value = "sample_data")]
    output_dir: String,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all diagnostics except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let client = connect(&cli.url).await?;
    let mut out = open_output(cli.output.as_ref())?;

    match &cli.command {
        Command::Indexes => {
            let export = emit::export_indexes(&client, &mut out).await?;
            info!("Exported {} index definitions", export.indexes.len());
        }
        Command::Metadata => {
            let mut summary_out = std::io::stderr();
            let snapshot = emit::export_metadata(&client, &mut out, &mut summary_out).await?;
            info!(
                "Exported metadata for {} databases, {} collections",
                snapshot.summary.total_databases, snapshot.summary.total_collections
            );
        }
        Command::Samples(args) => {
            let stats =
                emit::export_samples(&client, args.sample_size, &args.output_dir, &mut out)
                    .await?;
            info!(
                "Exported {} sample documents from {} collections ({} skipped)",
                stats.documents,
                stats.collections - stats.skipped,
                stats.skipped
            );
        }
    }

    out.flush().map_err(|e| CensusError::Io {
        context: "Failed to flush output".to_string(),
        source: e,
    })?;

    Ok(())
}

/// Establishes the cluster connection and verifies it with a ping.
///
/// A failure here is fatal and happens before any output is produced.
async fn connect(url: &str) -> Result<Client> {
    info!("Connecting to {}", redact_database_url(url));

    let client = Client::with_uri_str(url).await.map_err(|e| {
        error!("Failed to create client: {}", e);
        CensusError::connection_failed("Failed to parse connection string", e)
    })?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| {
            error!("Connection test failed: {}", e);
            CensusError::connection_failed("Cluster unreachable", e)
        })?;

    info!("Connected successfully");
    Ok(client)
}

/// Opens the structured output stream: a file when requested, stdout
/// otherwise.
fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| CensusError::Io {
                context: format!("Failed to create {}", path.display()),
                source: e,
            })?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::BufWriter::new(std::io::stdout()))),
    }
}
