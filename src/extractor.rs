use crate::error::Result;
use crate::fetch::Fetch;
use crate::record::SourceKind;
use crate::sink::{Sink, SinkGuard};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Statistics from one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    /// Number of items fetched and written to the sink
    pub items_written: usize,

    /// Stream identifier the run was tagged with
    pub stream_id: String,

    /// Total execution time
    pub duration: Duration,
}

/// Fetches resources by identifier and delivers them to a streaming sink.
///
/// Iteration is strictly sequential and preserves input order. A fetch
/// failure aborts the remaining iterations and propagates to the caller;
/// no retry or backoff is applied. The sink lifecycle is acquire-before-
/// loop, release-after-loop, with the release guaranteed on error paths
/// by a scope guard.
pub struct Extractor<F: Fetch> {
    fetcher: F,
    kind: SourceKind,
}

impl<F: Fetch> Extractor<F> {
    /// Creates an extractor over a fetch implementation.
    #[must_use]
    pub fn new(fetcher: F, kind: SourceKind) -> Self {
        Self { fetcher, kind }
    }

    /// Returns a reference to the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Extracts an explicit ordered list of resource identifiers.
    ///
    /// Opens the sink once before the loop, writes one item per
    /// successful fetch in input order, and finalizes the sink after the
    /// loop, including when a fetch fails partway through.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or sink error encountered. The sink is
    /// finalized before the error propagates.
    #[instrument(skip(self, sink), fields(fetcher = self.fetcher.name()))]
    pub fn extract(
        &self,
        stream_id: &str,
        ids: &[String],
        sink: &mut dyn Sink,
    ) -> Result<ExtractReport> {
        let start = Instant::now();
        info!("Extracting {} resource(s) into stream '{stream_id}'", ids.len());

        let mut guard = SinkGuard::start(sink, self.kind.tag(), stream_id)?;
        let mut items_written = 0;

        for id in ids {
            let item = self.fetcher.fetch(id)?;
            guard.write(&item)?;
            items_written += 1;
            debug!("Wrote item '{id}' ({items_written}/{})", ids.len());
        }

        guard.finish()?;

        let duration = start.elapsed();
        info!(
            "✓ Extracted {items_written} item(s) in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(ExtractReport {
            items_written,
            stream_id: stream_id.to_string(),
            duration,
        })
    }

    /// Extracts every member of a container (e.g. a playlist).
    ///
    /// Expansion is delegated entirely to the fetch layer; members are
    /// streamed in the order the container reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion fails or any sink write fails. The
    /// sink is finalized before the error propagates; if expansion itself
    /// fails, the sink is never opened.
    #[instrument(skip(self, sink), fields(fetcher = self.fetcher.name()))]
    pub fn extract_container(
        &self,
        container_id: &str,
        sink: &mut dyn Sink,
    ) -> Result<ExtractReport> {
        let start = Instant::now();
        info!("Expanding container '{container_id}'");

        let items = self.fetcher.expand(container_id)?;
        info!("Container '{container_id}' expanded to {} member(s)", items.len());

        let mut guard = SinkGuard::start(sink, self.kind.tag(), container_id)?;
        let mut items_written = 0;

        for item in &items {
            guard.write(item)?;
            items_written += 1;
        }

        guard.finish()?;

        let duration = start.elapsed();
        info!(
            "✓ Extracted {items_written} item(s) in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(ExtractReport {
            items_written,
            stream_id: container_id.to_string(),
            duration,
        })
    }
}
