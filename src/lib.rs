//! # docstage
//!
//! A batched extraction-and-staging pipeline for LLM document ingestion.
//!
//! ## Features
//!
//! - Pluggable fetch seam for external resource sources
//! - Streaming sink with a guaranteed start/write/end lifecycle
//! - Metadata pruning and size-capped document batching
//! - Row-wise frame merging with column normalization and entity tagging
//! - Atomic artifact staging (write-to-temp, rename)
//!
//! ## Quick Start
//!
//! ```no_run
//! use docstage::{Config, Pipeline, Source, SourceKind, StaticFetcher};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .staging_dir("./staging")
//!     .max_batch_docs(100)
//!     .build()?;
//!
//! let fetcher = StaticFetcher::from_file("./catalog.json")?;
//! let sources = vec![Source::Ids {
//!     stream_id: "run1".to_string(),
//!     ids: vec!["v1".to_string(), "v2".to_string()],
//! }];
//!
//! Pipeline::new(config, fetcher, SourceKind::Video, sources)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a linear pipeline architecture:
//! 1. **Extractor**: Resolves identifiers through the fetch seam
//! 2. **Sink**: Brackets item writes with an exception-safe lifecycle
//! 3. **Loader**: Prunes metadata and writes capped batch files
//! 4. **Stage**: Merges frames and replaces the artifact atomically

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod batch;
mod config;
mod error;
mod extractor;
mod fetch;
mod frame;
mod loader;
mod pipeline;
mod record;
mod sink;
mod stage;

pub use batch::{Batch, BatchOutcome, Batcher};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use extractor::{ExtractReport, Extractor};
pub use fetch::{Fetch, StaticFetcher};
pub use frame::{extract_entities, merge_frames, normalize_column_name, Frame, ENTITIES_COLUMN};
pub use loader::{LoadReport, Loader};
pub use pipeline::{Pipeline, PipelineStats, Source};
pub use record::{Document, Item, SourceKind};
pub use sink::{read_jsonl, JsonlSink, MemorySink, Sink, SinkGuard};
pub use stage::{read_artifact, write_artifact, write_batches};

/// Runs the complete extraction-and-staging pipeline.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - A fetch fails
/// - The staging directory cannot be written
///
/// # Examples
///
/// ```no_run
/// use docstage::{run, Config, Source, SourceKind, StaticFetcher};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder().staging_dir("./staging").build()?;
/// let fetcher = StaticFetcher::from_file("./catalog.json")?;
/// let sources = vec![Source::Container { id: "pl1".to_string() }];
///
/// run(config, fetcher, SourceKind::Playlist, sources)?;
/// # Ok(())
/// # }
/// ```
pub fn run<F: Fetch>(
    config: Config,
    fetcher: F,
    kind: SourceKind,
    sources: Vec<Source>,
) -> Result<PipelineStats> {
    Pipeline::new(config, fetcher, kind, sources)?.run()
}
