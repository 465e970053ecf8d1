use crate::batch::Batcher;
use crate::config::Config;
use crate::error::Result;
use crate::frame::{merge_frames, Frame};
use crate::record::Document;
use crate::stage;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Statistics from one load-and-batch run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Number of documents after pruning (input count)
    pub docs_loaded: usize,

    /// Number of batch files written
    pub batches_written: usize,

    /// Documents dropped for exceeding the size ceiling
    pub dropped_oversized: usize,

    /// Paths of the written batch files
    pub batch_paths: Vec<PathBuf>,
}

/// Merges, normalizes, enriches, and stages collected documents.
///
/// The loader owns the staging side of the pipeline: metadata pruning
/// and capped batching of documents, row-wise merging of tabular
/// extracts, and wholesale replacement of the staging artifact.
pub struct Loader {
    config: Config,
    batcher: Batcher,
}

impl Loader {
    /// Creates a loader from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            batcher: Batcher::new(config),
        }
    }

    /// Prunes configured metadata keys from every document in place,
    /// then persists the documents as capped batch files.
    ///
    /// The caller keeps the (now pruned) document list for further use.
    /// Pruning is idempotent: removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch file cannot be written.
    #[instrument(skip(self, documents), fields(docs = documents.len()))]
    pub fn load_docs(&self, documents: &mut [Document]) -> Result<LoadReport> {
        for document in documents.iter_mut() {
            document.prune_metadata(&self.config.prune_keys);
        }

        let outcome = self.batcher.partition(documents.to_vec());

        let batch_paths = if self.config.dry_run {
            warn!("Dry run mode enabled - skipping batch writes");
            Vec::new()
        } else {
            stage::write_batches(
                &self.config.staging_dir,
                &self.config.batch_pattern,
                &outcome.batches,
            )?
        };

        info!(
            "✓ Loaded {} document(s) into {} batch(es)",
            documents.len(),
            batch_paths.len()
        );

        Ok(LoadReport {
            docs_loaded: documents.len(),
            batches_written: batch_paths.len(),
            dropped_oversized: outcome.dropped_oversized,
            batch_paths,
        })
    }

    /// Merges tabular frames into one normalized, enriched frame.
    ///
    /// # Errors
    ///
    /// Returns an error on schema mismatch or a missing content column.
    pub fn merge(&self, frames: Vec<Frame>) -> Result<Frame> {
        let sources = frames.len();
        let merged = merge_frames(frames, &self.config.content_column)?;
        info!(
            "✓ Merged {sources} source(s) into {} row(s)",
            merged.row_count()
        );
        Ok(merged)
    }

    /// Persists a frame as the staging artifact, replacing any previous
    /// snapshot wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn stage(&self, frame: &Frame) -> Result<PathBuf> {
        let path = self.config.artifact_path();

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping artifact write");
            return Ok(path);
        }

        stage::write_artifact(&path, frame)?;
        Ok(path)
    }

    /// Reads the current staging artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_artifact(&self) -> Result<Frame> {
        stage::read_artifact(&self.config.artifact_path())
    }

    /// Removes the `n` rows with the largest content length from the
    /// staged artifact and rewrites it. Destructive by design.
    ///
    /// When the artifact holds fewer than `n` rows, all rows are dropped
    /// and the (now empty) artifact is rewritten; this is not an error.
    /// Ties are broken by keeping earlier rows.
    ///
    /// Returns the number of rows dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be read, the content
    /// column is absent, or the rewrite fails.
    #[instrument(skip(self))]
    pub fn drop_rows_with_longest_page_content(&self, n: usize) -> Result<usize> {
        let mut frame = self.load_artifact()?;
        let content_idx = frame.column_index(&self.config.content_column)?;

        let mut order: Vec<usize> = (0..frame.rows.len()).collect();
        order.sort_by(|&a, &b| {
            let len_a = frame.value_len(&frame.rows[a], content_idx);
            let len_b = frame.value_len(&frame.rows[b], content_idx);
            len_b.cmp(&len_a).then(b.cmp(&a))
        });

        let to_drop: std::collections::HashSet<usize> =
            order.into_iter().take(n).collect();
        let dropped = to_drop.len();

        let rows = std::mem::take(&mut frame.rows);
        frame.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !to_drop.contains(i))
            .map(|(_, row)| row)
            .collect();

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping artifact rewrite");
        } else {
            stage::write_artifact(&self.config.artifact_path(), &frame)?;
        }

        info!(
            "✓ Dropped {dropped} longest row(s), {} remaining",
            frame.row_count()
        );
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_in(dir: &std::path::Path) -> Config {
        Config::builder()
            .staging_dir(dir)
            .max_batch_docs(2)
            .max_doc_bytes(100)
            .prune_keys(["category", "tags"])
            .build()
            .unwrap()
    }

    fn doc(content: &str) -> Document {
        Document::new(content)
            .with_metadata("category", json!("howto"))
            .with_metadata("title", json!("keep"))
    }

    #[test]
    fn test_load_docs_prunes_and_batches() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut docs = vec![doc("one"), doc("two"), doc("three")];
        let report = loader.load_docs(&mut docs).unwrap();

        assert_eq!(report.docs_loaded, 3);
        assert_eq!(report.batches_written, 2);
        assert_eq!(report.dropped_oversized, 0);

        // Metadata pruned in place, caller keeps the list.
        for d in &docs {
            assert!(!d.metadata.contains_key("category"));
            assert!(d.metadata.contains_key("title"));
        }

        for path in &report.batch_paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_load_docs_is_idempotent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut docs = vec![doc("one")];
        loader.load_docs(&mut docs).unwrap();
        let after_first = docs[0].metadata.clone();
        loader.load_docs(&mut docs).unwrap();

        assert_eq!(docs[0].metadata, after_first);
    }

    #[test]
    fn test_load_docs_dry_run_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .staging_dir(temp.path().join("staging"))
            .dry_run(true)
            .build()
            .unwrap();
        let loader = Loader::new(&config);

        let mut docs = vec![doc("one")];
        let report = loader.load_docs(&mut docs).unwrap();

        assert_eq!(report.batches_written, 0);
        assert!(!temp.path().join("staging").exists());
    }

    #[test]
    fn test_stage_and_reload_artifact() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut frame = Frame::new(["page_content"]);
        frame.push_row(vec![json!("hello")]).unwrap();

        let path = loader.stage(&frame).unwrap();
        assert!(path.exists());

        let back = loader.load_artifact().unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_drop_longest_removes_largest_rows() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut frame = Frame::new(["page_content"]);
        frame.push_row(vec![json!("short")]).unwrap();
        frame.push_row(vec![json!("the longest row of them all")]).unwrap();
        frame.push_row(vec![json!("medium length")]).unwrap();
        loader.stage(&frame).unwrap();

        let dropped = loader.drop_rows_with_longest_page_content(2).unwrap();
        assert_eq!(dropped, 2);

        let back = loader.load_artifact().unwrap();
        assert_eq!(back.row_count(), 1);
        assert_eq!(back.rows[0][0], json!("short"));
    }

    #[test]
    fn test_drop_longest_with_fewer_rows_drops_all() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut frame = Frame::new(["page_content"]);
        frame.push_row(vec![json!("only row")]).unwrap();
        loader.stage(&frame).unwrap();

        let dropped = loader.drop_rows_with_longest_page_content(15).unwrap();
        assert_eq!(dropped, 1);

        let back = loader.load_artifact().unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_drop_longest_zero_is_noop() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut frame = Frame::new(["page_content"]);
        frame.push_row(vec![json!("row")]).unwrap();
        loader.stage(&frame).unwrap();

        assert_eq!(loader.drop_rows_with_longest_page_content(0).unwrap(), 0);
        assert_eq!(loader.load_artifact().unwrap().row_count(), 1);
    }

    #[test]
    fn test_merge_through_loader() {
        let temp = assert_fs::TempDir::new().unwrap();
        let loader = Loader::new(&config_in(temp.path()));

        let mut frame = Frame::new(["Page Content"]);
        frame.push_row(vec![json!("visited Berlin today")]).unwrap();

        let merged = loader.merge(vec![frame]).unwrap();
        assert_eq!(merged.row_count(), 1);
        assert!(merged.columns.contains(&"entities".to_string()));
    }
}
