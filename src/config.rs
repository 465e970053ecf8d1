use crate::error::{Error, Result};
use std::path::PathBuf;

const DEFAULT_MAX_BATCH_DOCS: usize = 100;
const DEFAULT_MAX_DOC_BYTES: usize = 40_000;
const DEFAULT_DROP_COUNT: usize = 15;
const DEFAULT_BATCH_PATTERN: &str = "batch_{index:03}.json";
const DEFAULT_ARTIFACT_NAME: &str = "staging.json";
const DEFAULT_CONTENT_COLUMN: &str = "page_content";

/// Configuration for the docstage pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Directory holding stream files, batch files, and the staging artifact
    pub staging_dir: PathBuf,

    /// Filename of the staging artifact snapshot
    pub artifact_name: String,

    /// Batch filename pattern (supports {index}, {index:02}, {index:03})
    pub batch_pattern: String,

    /// Maximum number of documents per batch file
    pub max_batch_docs: usize,

    /// Maximum content size in bytes for a single document.
    /// Documents exceeding this ceiling are dropped, never truncated or split.
    pub max_doc_bytes: usize,

    /// Metadata keys removed from documents before batching
    pub prune_keys: Vec<String>,

    /// Canonical content column name in merged frames
    pub content_column: String,

    /// Default row count for the drop-longest-content operation
    pub drop_count: usize,

    /// Dry run mode (no file writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use docstage::Config;
    ///
    /// let config = Config::builder()
    ///     .staging_dir("./staging")
    ///     .max_batch_docs(50)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The staging directory path is empty
    /// - Size ceilings are zero
    /// - The batch pattern is invalid
    pub fn validate(&self) -> Result<()> {
        if self.staging_dir.as_os_str().is_empty() {
            return Err(Error::config("staging_dir must not be empty"));
        }

        if self.max_batch_docs == 0 {
            return Err(Error::config("max_batch_docs must be greater than 0"));
        }

        if self.max_doc_bytes == 0 {
            return Err(Error::config("max_doc_bytes must be greater than 0"));
        }

        if self.artifact_name.is_empty() {
            return Err(Error::config("artifact_name must not be empty"));
        }

        let has_placeholder = ["{index}", "{index:02}", "{index:03}"]
            .iter()
            .any(|p| self.batch_pattern.contains(p));
        if !has_placeholder {
            return Err(Error::invalid_pattern(
                &self.batch_pattern,
                "Pattern must contain an {index}, {index:02}, or {index:03} placeholder",
            ));
        }

        Ok(())
    }

    /// Returns the full path to the staging artifact file.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.staging_dir.join(&self.artifact_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("staging"),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            batch_pattern: DEFAULT_BATCH_PATTERN.to_string(),
            max_batch_docs: DEFAULT_MAX_BATCH_DOCS,
            max_doc_bytes: DEFAULT_MAX_DOC_BYTES,
            prune_keys: Vec::new(),
            content_column: DEFAULT_CONTENT_COLUMN.to_string(),
            drop_count: DEFAULT_DROP_COUNT,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    staging_dir: Option<PathBuf>,
    artifact_name: Option<String>,
    batch_pattern: Option<String>,
    max_batch_docs: Option<usize>,
    max_doc_bytes: Option<usize>,
    prune_keys: Vec<String>,
    content_column: Option<String>,
    drop_count: Option<usize>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the staging directory.
    #[must_use]
    pub fn staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Sets the staging artifact filename.
    #[must_use]
    pub fn artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = Some(name.into());
        self
    }

    /// Sets the batch filename pattern.
    ///
    /// Pattern must contain an `{index}`, `{index:02}`, or `{index:03}`
    /// placeholder.
    #[must_use]
    pub fn batch_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.batch_pattern = Some(pattern.into());
        self
    }

    /// Sets the maximum documents per batch.
    #[must_use]
    pub fn max_batch_docs(mut self, count: usize) -> Self {
        self.max_batch_docs = Some(count);
        self
    }

    /// Sets the per-document content size ceiling in bytes.
    #[must_use]
    pub fn max_doc_bytes(mut self, bytes: usize) -> Self {
        self.max_doc_bytes = Some(bytes);
        self
    }

    /// Adds metadata keys to prune from documents before batching.
    #[must_use]
    pub fn prune_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prune_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Sets the canonical content column name.
    #[must_use]
    pub fn content_column(mut self, name: impl Into<String>) -> Self {
        self.content_column = Some(name.into());
        self
    }

    /// Sets the default row count for the drop-longest-content operation.
    #[must_use]
    pub fn drop_count(mut self, count: usize) -> Self {
        self.drop_count = Some(count);
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            staging_dir: self.staging_dir.unwrap_or_else(|| PathBuf::from("staging")),
            artifact_name: self
                .artifact_name
                .unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string()),
            batch_pattern: self
                .batch_pattern
                .unwrap_or_else(|| DEFAULT_BATCH_PATTERN.to_string()),
            max_batch_docs: self.max_batch_docs.unwrap_or(DEFAULT_MAX_BATCH_DOCS),
            max_doc_bytes: self.max_doc_bytes.unwrap_or(DEFAULT_MAX_DOC_BYTES),
            prune_keys: self.prune_keys,
            content_column: self
                .content_column
                .unwrap_or_else(|| DEFAULT_CONTENT_COLUMN.to_string()),
            drop_count: self.drop_count.unwrap_or(DEFAULT_DROP_COUNT),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::builder().build().unwrap();

        assert_eq!(config.max_batch_docs, DEFAULT_MAX_BATCH_DOCS);
        assert_eq!(config.max_doc_bytes, DEFAULT_MAX_DOC_BYTES);
        assert_eq!(config.drop_count, DEFAULT_DROP_COUNT);
        assert_eq!(config.content_column, "page_content");
    }

    #[test]
    fn test_artifact_path() {
        let config = Config::builder()
            .staging_dir("/tmp/staging")
            .artifact_name("snapshot.json")
            .build()
            .unwrap();

        assert_eq!(
            config.artifact_path(),
            PathBuf::from("/tmp/staging/snapshot.json")
        );
    }

    #[test]
    fn test_invalid_batch_docs() {
        let result = Config::builder().max_batch_docs(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_doc_bytes() {
        let result = Config::builder().max_doc_bytes(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Config::builder().batch_pattern("no_placeholder.json").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_index_width_rejected() {
        // "{index:04}" is never expanded, so every batch would land on
        // the same literal filename. Only the supported widths pass.
        let result = Config::builder()
            .batch_pattern("batch_{index:04}.json")
            .build();
        assert!(result.is_err());

        assert!(Config::builder()
            .batch_pattern("batch_{index:02}.json")
            .build()
            .is_ok());
        assert!(Config::builder()
            .batch_pattern("batch_{index}.json")
            .build()
            .is_ok());
    }

    #[test]
    fn test_prune_keys_are_additive() {
        let config = Config::builder()
            .prune_keys(["category"])
            .prune_keys(["tags", "internal_id"])
            .build()
            .unwrap();

        assert_eq!(config.prune_keys, vec!["category", "tags", "internal_id"]);
    }
}
