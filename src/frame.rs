use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Runs of capitalized words, two or more characters each. Intentionally
/// coarse: good enough to tag people, products, and place names in
/// extracted text without a model dependency.
static ENTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Z][A-Za-z0-9]+(?:\s+[A-Z][A-Za-z0-9]+)*").expect("valid entity regex")
});

/// Name of the enrichment column appended by [`merge_frames`].
pub const ENTITIES_COLUMN: &str = "entities";

/// A lightweight column-ordered table of JSON values.
///
/// This is the tabular merge target for extracted records: every row has
/// exactly one value per column, and the artifact snapshot on disk is a
/// serialized `Frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Ordered column names
    pub columns: Vec<String>,

    /// Row-major values; each row has one value per column
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Creates an empty frame with the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row length does not match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::config(format!(
                "row has {} values but frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Checks that every row has exactly one value per column.
    ///
    /// Deserialized frames may carry ragged rows; anything that indexes
    /// rows by column must see a validated frame first.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first ragged row.
    pub fn validate(&self) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(Error::config(format!(
                    "row {i} has {} values but frame has {} columns",
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }

    /// Returns the index of a column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is absent.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::missing_column(name))
    }

    /// Normalizes all column names to the canonical form in place.
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = normalize_column_name(column);
        }
    }

    /// Returns the string length of a row's value in the given column.
    ///
    /// Non-string values count as the length of their JSON rendering.
    #[must_use]
    pub(crate) fn value_len(&self, row: &[Value], column_idx: usize) -> usize {
        match &row[column_idx] {
            Value::String(s) => s.len(),
            other => other.to_string().len(),
        }
    }
}

/// Normalizes a column name: lowercase, alphanumerics preserved, every
/// other character run collapsed into a single underscore.
///
/// `"Page Content"` and `"page-content"` both become `"page_content"`.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = true;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    while out.ends_with('_') {
        out.pop();
    }

    out
}

/// Extracts named entities from text: deduplicated runs of capitalized
/// words, in order of first appearance.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in ENTITY_PATTERN.find_iter(text) {
        let entity = m.as_str().to_string();
        if !seen.contains(&entity) {
            seen.push(entity);
        }
    }
    seen
}

/// Merges tabular frames into one normalized, enriched frame.
///
/// Steps, in order:
/// 1. Normalize every frame's column names to the canonical schema.
/// 2. Concatenate all frames row-wise. Frames whose normalized columns
///    are a reordering of the first frame's are remapped; anything else
///    is a schema mismatch.
/// 3. Append an `entities` column derived from `content_column`.
///
/// # Errors
///
/// Returns an error if the input is empty, a frame carries ragged rows,
/// a frame's schema is incompatible, or `content_column` is absent after
/// normalization.
pub fn merge_frames(frames: Vec<Frame>, content_column: &str) -> Result<Frame> {
    let mut iter = frames.into_iter();
    let Some(mut merged) = iter.next() else {
        return Err(Error::config("no frames to merge"));
    };
    merged.validate()?;
    merged.normalize_columns();

    for mut frame in iter {
        frame.validate()?;
        frame.normalize_columns();

        if frame.columns == merged.columns {
            merged.rows.append(&mut frame.rows);
            continue;
        }

        // Same column set in a different order: remap rows.
        let mapping: Result<Vec<usize>> = merged
            .columns
            .iter()
            .map(|c| {
                frame.columns.iter().position(|f| f == c).ok_or_else(|| {
                    Error::schema(merged.columns.clone(), frame.columns.clone())
                })
            })
            .collect();
        let mapping = mapping?;

        if mapping.len() != frame.columns.len() {
            return Err(Error::schema(merged.columns.clone(), frame.columns));
        }

        debug!("Remapping frame columns {:?} to canonical order", frame.columns);
        for row in frame.rows {
            let remapped = mapping.iter().map(|&i| row[i].clone()).collect();
            merged.rows.push(remapped);
        }
    }

    enrich_with_entities(&mut merged, content_column)?;
    Ok(merged)
}

/// Appends (or recomputes) the `entities` column from the content column.
fn enrich_with_entities(frame: &mut Frame, content_column: &str) -> Result<()> {
    let content_idx = frame.column_index(content_column)?;

    let entity_values: Vec<Value> = frame
        .rows
        .iter()
        .map(|row| match &row[content_idx] {
            Value::String(text) => Value::Array(
                extract_entities(text).into_iter().map(Value::String).collect(),
            ),
            _ => Value::Array(Vec::new()),
        })
        .collect();

    match frame.columns.iter().position(|c| c == ENTITIES_COLUMN) {
        Some(idx) => {
            warn!("Recomputing existing '{ENTITIES_COLUMN}' column");
            for (row, value) in frame.rows.iter_mut().zip(entity_values) {
                row[idx] = value;
            }
        }
        None => {
            frame.columns.push(ENTITIES_COLUMN.to_string());
            for (row, value) in frame.rows.iter_mut().zip(entity_values) {
                row.push(value);
            }
        }
    }

    Ok(())
}
