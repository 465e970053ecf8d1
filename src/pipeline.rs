use crate::{
    config::Config,
    error::Result,
    extractor::Extractor,
    fetch::Fetch,
    loader::Loader,
    record::{Document, SourceKind},
    sink::{self, JsonlSink, MemorySink, Sink},
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// One extraction source fed into the pipeline.
#[derive(Debug, Clone)]
pub enum Source {
    /// An explicit ordered list of resource identifiers
    Ids {
        /// Stream identifier the run is tagged with
        stream_id: String,
        /// Resource identifiers, fetched in order
        ids: Vec<String>,
    },
    /// A container identifier expanded by the fetch layer
    Container {
        /// Container (playlist) identifier
        id: String,
    },
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Number of sources extracted
    pub sources: usize,

    /// Total items fetched and streamed
    pub items_extracted: usize,

    /// Documents that entered the batching step
    pub docs_loaded: usize,

    /// Number of batch files written
    pub batches_written: usize,

    /// Documents dropped for exceeding the size ceiling
    pub dropped_oversized: usize,

    /// Total execution time
    pub duration: Duration,

    /// Time spent extracting
    pub extract_duration: Duration,

    /// Time spent loading and batching
    pub load_duration: Duration,

    /// Staging directory path
    pub staging_directory: String,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Pipeline Execution Summary                 ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Sources Extracted:    {:>8}                        ║",
            self.sources
        );
        println!(
            "║ Items Streamed:       {:>8}                        ║",
            self.items_extracted
        );
        println!(
            "║ Documents Loaded:     {:>8}                        ║",
            self.docs_loaded
        );
        println!(
            "║ Batches Written:      {:>8}                        ║",
            self.batches_written
        );
        println!(
            "║ Oversized Dropped:    {:>8}                        ║",
            self.dropped_oversized
        );
        println!("║                                                       ║");
        println!("║ Staging Directory:                                    ║");
        println!(
            "║   {}                                              ║",
            self.staging_directory
        );
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Extracting:       {:>8.2}s                     ║",
            self.extract_duration.as_secs_f64()
        );
        println!(
            "║   - Loading:          {:>8.2}s                     ║",
            self.load_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Main pipeline orchestrator: extract → stream → prune → batch.
///
/// Each source is extracted into its own finalized stream file, the
/// streamed items become documents, and the loader prunes and batches
/// them. Everything runs sequentially on the calling thread.
pub struct Pipeline<F: Fetch> {
    config: Config,
    extractor: Extractor<F>,
    loader: Loader,
    sources: Vec<Source>,
}

impl<F: Fetch> Pipeline<F> {
    /// Creates a new pipeline with the given configuration and fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config, fetcher: F, kind: SourceKind, sources: Vec<Source>) -> Result<Self> {
        config.validate()?;

        let loader = Loader::new(&config);
        let extractor = Extractor::new(fetcher, kind);

        Ok(Self {
            config,
            extractor,
            loader,
            sources,
        })
    }

    /// Executes the complete pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Extract**: Streams each source into its own stream file
    /// 2. **Collect**: Reads the finalized streams back into documents
    /// 3. **Load**: Prunes metadata and writes capped batch files
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails; streams opened before the
    /// failure are finalized before it propagates.
    #[instrument(skip(self), fields(staging_dir = %self.config.staging_dir.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        info!("Starting pipeline execution");

        // Stage 1: Extraction
        info!("Stage 1/2: Extracting {} source(s)...", self.sources.len());
        let extract_start = Instant::now();
        let items = self.extract_all()?;
        let extract_duration = extract_start.elapsed();

        let items_extracted = items.len();
        info!(
            "✓ Extracted {items_extracted} item(s) in {:.2}s",
            extract_duration.as_secs_f64()
        );

        // Stage 2: Loading
        info!("Stage 2/2: Pruning and batching documents...");
        let load_start = Instant::now();
        let mut documents: Vec<Document> = items.into_iter().map(Document::from).collect();
        let report = self.loader.load_docs(&mut documents)?;
        let load_duration = load_start.elapsed();

        info!(
            "✓ Wrote {} batch(es) in {:.2}s",
            report.batches_written,
            load_duration.as_secs_f64()
        );

        let duration = start_time.elapsed();
        let stats = PipelineStats {
            sources: self.sources.len(),
            items_extracted,
            docs_loaded: report.docs_loaded,
            batches_written: report.batches_written,
            dropped_oversized: report.dropped_oversized,
            duration,
            extract_duration,
            load_duration,
            staging_directory: self.config.staging_dir.display().to_string(),
        };

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Runs every source through the extractor, returning all items in
    /// source order.
    fn extract_all(&self) -> Result<Vec<crate::record::Item>> {
        if self.config.dry_run {
            warn!("Dry run mode enabled - streaming to memory only");
            return self.extract_to_memory();
        }

        let mut stream_paths: Vec<PathBuf> = Vec::new();

        for source in &self.sources {
            let mut file_sink = JsonlSink::new(&self.config.staging_dir);
            self.extract_one(source, &mut file_sink)?;
            if let Some(path) = file_sink.last_path() {
                stream_paths.push(path.to_path_buf());
            }
        }

        let mut items = Vec::new();
        for path in &stream_paths {
            items.extend(sink::read_jsonl(path)?);
        }
        Ok(items)
    }

    fn extract_to_memory(&self) -> Result<Vec<crate::record::Item>> {
        let mut memory = MemorySink::new();
        for source in &self.sources {
            self.extract_one(source, &mut memory)?;
        }
        Ok(memory.into_items())
    }

    fn extract_one(&self, source: &Source, sink: &mut dyn Sink) -> Result<()> {
        match source {
            Source::Ids { stream_id, ids } => {
                self.extractor.extract(stream_id, ids, sink)?;
            }
            Source::Container { id } => {
                self.extractor.extract_container(id, sink)?;
            }
        }
        Ok(())
    }
}
