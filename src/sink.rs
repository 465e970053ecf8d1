use crate::error::{Error, Result};
use crate::record::Item;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A streaming sink bracketing item writes with an explicit lifecycle.
///
/// `start` must be called exactly once before any writes; `end` exactly
/// once afterwards, even when zero items were written. Single-threaded
/// use is assumed; no behavior is defined for concurrent writers.
pub trait Sink {
    /// Opens a stream tagged with a kind and identifier for traceability.
    ///
    /// # Errors
    ///
    /// Returns an error if a stream is already open or the destination
    /// cannot be prepared.
    fn start(&mut self, kind: &str, id: &str) -> Result<()>;

    /// Appends one item to the open stream.
    ///
    /// # Errors
    ///
    /// Returns an error if no stream is open or the write fails.
    fn write(&mut self, item: &Item) -> Result<()>;

    /// Finalizes and releases the open stream.
    ///
    /// # Errors
    ///
    /// Returns an error if no stream is open or finalization fails.
    fn end(&mut self) -> Result<()>;
}

/// Scope guard ensuring a sink is finalized on every exit path.
///
/// The extraction loop runs inside this guard so that an error mid-loop
/// still closes the stream before propagating. Call [`SinkGuard::finish`]
/// to surface finalization errors; if the guard is dropped instead, the
/// close happens best-effort and a failure is logged.
pub struct SinkGuard<'a> {
    sink: &'a mut dyn Sink,
    finished: bool,
}

impl<'a> SinkGuard<'a> {
    /// Opens the sink and returns a guard holding it.
    ///
    /// # Errors
    ///
    /// Returns an error if `start` fails.
    pub fn start(sink: &'a mut dyn Sink, kind: &str, id: &str) -> Result<Self> {
        sink.start(kind, id)?;
        Ok(Self {
            sink,
            finished: false,
        })
    }

    /// Writes one item through the guarded sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    pub fn write(&mut self, item: &Item) -> Result<()> {
        self.sink.write(item)
    }

    /// Finalizes the sink explicitly, surfacing any close error.
    ///
    /// # Errors
    ///
    /// Returns an error if `end` fails.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.sink.end()
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.sink.end() {
                warn!("Failed to finalize sink during unwind: {e}");
            }
        }
    }
}

enum StreamState {
    Idle,
    Open {
        writer: BufWriter<File>,
        tmp_path: PathBuf,
        final_path: PathBuf,
        written: usize,
    },
}

/// File-backed sink writing one JSON object per line.
///
/// Each stream lands in `<dir>/<kind>_<id>.jsonl`. Writes go to a `.tmp`
/// sibling that is flushed, synced, and atomically renamed on `end`, so
/// a finalized stream is never partially written.
pub struct JsonlSink {
    dir: PathBuf,
    state: StreamState,
    last_path: Option<PathBuf>,
}

impl JsonlSink {
    /// Creates a sink writing streams into the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: StreamState::Idle,
            last_path: None,
        }
    }

    /// Returns the path of the most recently finalized stream.
    #[must_use]
    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }

    /// Returns the number of items written to the open stream.
    #[must_use]
    pub fn written(&self) -> usize {
        match &self.state {
            StreamState::Open { written, .. } => *written,
            StreamState::Idle => 0,
        }
    }
}

impl Sink for JsonlSink {
    fn start(&mut self, kind: &str, id: &str) -> Result<()> {
        if matches!(self.state, StreamState::Open { .. }) {
            return Err(Error::sink_state("start called while a stream is open"));
        }

        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let final_path = self.dir.join(format!("{kind}_{id}.jsonl"));
        let tmp_path = final_path.with_extension("jsonl.tmp");
        let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;

        debug!("Opened stream {kind}:{id} at {}", tmp_path.display());

        self.state = StreamState::Open {
            writer: BufWriter::new(file),
            tmp_path,
            final_path,
            written: 0,
        };

        Ok(())
    }

    fn write(&mut self, item: &Item) -> Result<()> {
        let StreamState::Open {
            writer,
            tmp_path,
            written,
            ..
        } = &mut self.state
        else {
            return Err(Error::sink_state("write called before start"));
        };

        let line = serde_json::to_string(item)?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| Error::io(&*tmp_path, e))?;
        *written += 1;

        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, StreamState::Idle);
        let StreamState::Open {
            writer,
            tmp_path,
            final_path,
            written,
        } = state
        else {
            return Err(Error::sink_state("end called before start"));
        };

        let file = writer
            .into_inner()
            .map_err(|e| Error::io(&tmp_path, e.into_error()))?;
        file.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &final_path).map_err(|e| Error::io(&final_path, e))?;

        info!("Finalized stream ({written} items) at {}", final_path.display());
        self.last_path = Some(final_path);

        Ok(())
    }
}

/// Reads a finalized JSONL stream back into items.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line fails to parse.
pub fn read_jsonl(path: &Path) -> Result<Vec<Item>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    raw.lines()
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

/// In-memory sink collecting items instead of persisting them.
///
/// Used in dry-run mode and in tests; enforces the same lifecycle
/// contract as the file-backed sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    items: Vec<Item>,
    open: bool,
}

impl MemorySink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the sink, returning all collected items.
    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    /// Returns the collected items.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

impl Sink for MemorySink {
    fn start(&mut self, kind: &str, id: &str) -> Result<()> {
        if self.open {
            return Err(Error::sink_state("start called while a stream is open"));
        }
        debug!("Opened in-memory stream {kind}:{id}");
        self.open = true;
        Ok(())
    }

    fn write(&mut self, item: &Item) -> Result<()> {
        if !self.open {
            return Err(Error::sink_state("write called before start"));
        }
        self.items.push(item.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::sink_state("end called before start"));
        }
        self.open = false;
        Ok(())
    }
}
