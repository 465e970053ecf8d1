use anyhow::Context;
use clap::{Parser, Subcommand};
use docstage::{
    read_artifact, Config, Document, Frame, Loader, Pipeline, Source, SourceKind, StaticFetcher,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "docstage",
    version,
    about = "Batched extraction and staging pipeline for LLM document ingestion",
    long_about = "Fetches items from a catalog, streams them through a lifecycle-bracketed \
    sink, batches documents into size-capped files, and maintains a single normalized \
    staging artifact for downstream embedding pipelines.\n\n\
    USAGE EXAMPLES:\n  \
      # Extract an explicit id list\n  \
      docstage extract --catalog catalog.json --ids v1,v2,v3\n\n  \
      # Expand a playlist\n  \
      docstage extract --catalog catalog.json --container pl1\n\n  \
      # Prune and batch collected documents\n  \
      docstage load --docs docs.json --prune-key category --prune-key tags\n\n  \
      # Merge frames into the staging artifact\n  \
      docstage merge --frames a.json --frames b.json\n\n  \
      # Trim the artifact for a downstream size limit\n  \
      docstage drop-longest --count 15"
)]
struct Cli {
    /// Staging directory for streams, batches, and the artifact
    #[arg(short, long, default_value = "staging", value_name = "PATH", global = true)]
    staging_dir: PathBuf,

    /// Dry run (don't write files)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch resources and stream them into the staging directory
    Extract {
        /// Catalog JSON file backing the fetcher
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Comma-separated resource identifiers to fetch in order
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        ids: Vec<String>,

        /// Container (playlist) identifier to expand instead of --ids
        #[arg(long, value_name = "ID", conflicts_with = "ids")]
        container: Option<String>,

        /// Stream identifier for --ids runs
        #[arg(long, default_value = "run", value_name = "NAME")]
        stream_id: String,

        /// Source kind tag for the streams
        #[arg(long, value_enum, default_value = "video")]
        kind: CliSourceKind,

        /// Max documents per batch file
        #[arg(long, default_value_t = 100)]
        max_batch_docs: usize,

        /// Per-document content ceiling in bytes
        #[arg(long, default_value_t = 40_000)]
        max_doc_bytes: usize,
    },

    /// Prune metadata and write capped batch files from collected documents
    Load {
        /// JSON file holding an array of documents
        #[arg(long, value_name = "FILE")]
        docs: PathBuf,

        /// Metadata key to remove (repeatable)
        #[arg(long = "prune-key", value_name = "KEY")]
        prune_keys: Vec<String>,

        /// Max documents per batch file
        #[arg(long, default_value_t = 100)]
        max_batch_docs: usize,

        /// Per-document content ceiling in bytes
        #[arg(long, default_value_t = 40_000)]
        max_doc_bytes: usize,
    },

    /// Merge tabular frames and replace the staging artifact
    Merge {
        /// Frame JSON file (repeatable, merged in order)
        #[arg(long = "frames", value_name = "FILE", required = true)]
        frames: Vec<PathBuf>,

        /// Canonical content column name
        #[arg(long, default_value = "page_content")]
        content_column: String,
    },

    /// Drop the N rows with the longest content from the artifact
    DropLongest {
        /// Number of rows to drop
        #[arg(long, default_value_t = 15)]
        count: usize,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliSourceKind {
    Video,
    Playlist,
    Forum,
    Other,
}

impl From<CliSourceKind> for SourceKind {
    fn from(k: CliSourceKind) -> Self {
        match k {
            CliSourceKind::Video => Self::Video,
            CliSourceKind::Playlist => Self::Playlist,
            CliSourceKind::Forum => Self::Forum,
            CliSourceKind::Other => Self::Other,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    match cli.command {
        Command::Extract {
            catalog,
            ids,
            container,
            stream_id,
            kind,
            max_batch_docs,
            max_doc_bytes,
        } => {
            let config = Config::builder()
                .staging_dir(cli.staging_dir)
                .max_batch_docs(max_batch_docs)
                .max_doc_bytes(max_doc_bytes)
                .dry_run(cli.dry_run)
                .build()
                .context("Failed to build configuration")?;

            let fetcher = StaticFetcher::from_file(&catalog)
                .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;

            let sources = match container {
                Some(id) => vec![Source::Container { id }],
                None => {
                    anyhow::ensure!(!ids.is_empty(), "either --ids or --container is required");
                    vec![Source::Ids { stream_id, ids }]
                }
            };

            let stats = Pipeline::new(config, fetcher, kind.into(), sources)
                .context("Failed to create pipeline")?
                .run()
                .context("Pipeline execution failed")?;
            stats.print_summary();
        }

        Command::Load {
            docs,
            prune_keys,
            max_batch_docs,
            max_doc_bytes,
        } => {
            let config = Config::builder()
                .staging_dir(cli.staging_dir)
                .max_batch_docs(max_batch_docs)
                .max_doc_bytes(max_doc_bytes)
                .prune_keys(prune_keys)
                .dry_run(cli.dry_run)
                .build()
                .context("Failed to build configuration")?;

            let raw = fs::read_to_string(&docs)
                .with_context(|| format!("Failed to read {}", docs.display()))?;
            let mut documents: Vec<Document> =
                serde_json::from_str(&raw).context("Failed to parse documents")?;

            let report = Loader::new(&config)
                .load_docs(&mut documents)
                .context("Load failed")?;
            println!(
                "Loaded {} document(s) into {} batch(es) ({} oversized dropped)",
                report.docs_loaded, report.batches_written, report.dropped_oversized
            );
        }

        Command::Merge {
            frames,
            content_column,
        } => {
            let config = Config::builder()
                .staging_dir(cli.staging_dir)
                .content_column(content_column)
                .dry_run(cli.dry_run)
                .build()
                .context("Failed to build configuration")?;

            let mut loaded: Vec<Frame> = Vec::with_capacity(frames.len());
            for path in &frames {
                let frame = read_artifact(path)
                    .with_context(|| format!("Failed to read frame {}", path.display()))?;
                loaded.push(frame);
            }

            let loader = Loader::new(&config);
            let merged = loader.merge(loaded).context("Merge failed")?;
            let path = loader.stage(&merged).context("Staging failed")?;
            println!(
                "Staged {} row(s) x {} column(s) at {}",
                merged.row_count(),
                merged.columns.len(),
                path.display()
            );
        }

        Command::DropLongest { count } => {
            let config = Config::builder()
                .staging_dir(cli.staging_dir)
                .drop_count(count)
                .dry_run(cli.dry_run)
                .build()
                .context("Failed to build configuration")?;

            let dropped = Loader::new(&config)
                .drop_rows_with_longest_page_content(count)
                .context("Drop failed")?;
            println!("Dropped {dropped} row(s) from the staging artifact");
        }
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("docstage=info"),
        1 => EnvFilter::new("docstage=debug"),
        _ => EnvFilter::new("docstage=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();

    Ok(())
}
