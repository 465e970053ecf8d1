use crate::config::Config;
use crate::record::Document;
use tracing::{debug, warn};

/// A capped group of documents destined for one batch file.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Sequential batch index (0-based)
    pub index: usize,

    /// Documents included in this batch
    pub documents: Vec<Document>,

    /// Total content bytes across all documents
    pub total_bytes: usize,
}

impl Batch {
    /// Creates a new batch.
    #[must_use]
    pub fn new(index: usize, documents: Vec<Document>, total_bytes: usize) -> Self {
        Self {
            index,
            documents,
            total_bytes,
        }
    }

    /// Returns the number of documents in this batch.
    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if this batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Result of partitioning documents into batches.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The capped batches, in input order
    pub batches: Vec<Batch>,

    /// Number of documents dropped for exceeding the size ceiling
    pub dropped_oversized: usize,
}

/// Partitions documents into capped batches.
///
/// Boundaries are determined purely by the count ceiling, never by
/// content semantics. Documents whose content exceeds the per-document
/// byte ceiling are dropped outright, not truncated or split, because
/// the downstream consumer rejects oversized payloads wholesale.
pub struct Batcher {
    max_batch_docs: usize,
    max_doc_bytes: usize,
}

impl Batcher {
    /// Creates a new batcher from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            max_batch_docs: config.max_batch_docs,
            max_doc_bytes: config.max_doc_bytes,
        }
    }

    /// Partitions documents into batches, preserving input order.
    #[must_use]
    pub fn partition(&self, documents: Vec<Document>) -> BatchOutcome {
        let mut batches = Vec::new();
        let mut builder = BatchBuilder::new(0);
        let mut dropped_oversized = 0;

        for document in documents {
            if document.content_bytes() > self.max_doc_bytes {
                warn!(
                    "Dropping oversized document ({} bytes > {} ceiling)",
                    document.content_bytes(),
                    self.max_doc_bytes
                );
                dropped_oversized += 1;
                continue;
            }

            if builder.doc_count() >= self.max_batch_docs {
                let next_index = builder.index + 1;
                if let Some(batch) = builder.build() {
                    batches.push(batch);
                }
                builder = BatchBuilder::new(next_index);
            }

            builder.add(document);
        }

        if let Some(batch) = builder.build() {
            batches.push(batch);
        }

        debug!(
            "Partitioned into {} batch(es), {} oversized document(s) dropped",
            batches.len(),
            dropped_oversized
        );

        BatchOutcome {
            batches,
            dropped_oversized,
        }
    }
}

/// Accumulates documents for one batch.
struct BatchBuilder {
    index: usize,
    documents: Vec<Document>,
    total_bytes: usize,
}

impl BatchBuilder {
    fn new(index: usize) -> Self {
        Self {
            index,
            documents: Vec::new(),
            total_bytes: 0,
        }
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }

    fn add(&mut self, document: Document) {
        self.total_bytes += document.content_bytes();
        self.documents.push(document);
    }

    /// Produces the batch, or None if nothing was added.
    fn build(self) -> Option<Batch> {
        if self.documents.is_empty() {
            None
        } else {
            Some(Batch::new(self.index, self.documents, self.total_bytes))
        }
    }
}
