//! Atomic persistence for the staging artifact and batch files.
//!
//! Every write here follows the write-to-temp-then-rename pattern so a
//! crash mid-write never leaves a corrupt snapshot behind. The artifact
//! is replaced wholesale on each staging operation; there is no
//! incremental update protocol.

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::frame::Frame;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes bytes to a file atomically.
///
/// # Process
///
/// 1. Writes content to a `.tmp` sibling
/// 2. Syncs the temporary file to disk
/// 3. Atomically renames it over the target path
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut temp_file = File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Persists the artifact snapshot, replacing any previous contents.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, serialization
/// fails, or the write fails.
pub fn write_artifact(path: &Path, frame: &Frame) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let content = serde_json::to_vec_pretty(frame)?;
    write_atomic(path, &content)?;

    info!(
        "Staged artifact ({} rows, {} columns) at {}",
        frame.row_count(),
        frame.columns.len(),
        path.display()
    );
    Ok(())
}

/// Reads the current artifact snapshot from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// snapshot carries rows that do not match its column count.
pub fn read_artifact(path: &Path) -> Result<Frame> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let frame: Frame = serde_json::from_str(&raw)?;
    frame.validate()?;
    Ok(frame)
}

/// Writes batches as pretty JSON arrays named by the batch pattern.
///
/// Returns the paths written, one per batch.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or any write
/// fails.
pub fn write_batches(dir: &Path, pattern: &str, batches: &[Batch]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut paths = Vec::with_capacity(batches.len());
    for batch in batches {
        let path = dir.join(batch_filename(pattern, batch.index));
        let content = serde_json::to_vec_pretty(&batch.documents)?;
        write_atomic(&path, &content)?;

        debug!(
            "Wrote batch {} ({} docs, {} bytes) to {}",
            batch.index,
            batch.doc_count(),
            batch.total_bytes,
            path.display()
        );
        paths.push(path);
    }

    Ok(paths)
}

/// Expands the `{index}` placeholders in a batch filename pattern.
fn batch_filename(pattern: &str, index: usize) -> String {
    pattern
        .replace("{index:03}", &format!("{:03}", index + 1))
        .replace("{index:02}", &format!("{:02}", index + 1))
        .replace("{index}", &(index + 1).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Document;
    use assert_fs::prelude::*;
    use serde_json::json;

    fn sample_frame() -> Frame {
        let mut frame = Frame::new(["page_content"]);
        frame.push_row(vec![json!("row one")]).unwrap();
        frame.push_row(vec![json!("row two")]).unwrap();
        frame
    }

    #[test]
    fn test_artifact_roundtrip() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("staging.json");
        let frame = sample_frame();

        write_artifact(&path, &frame).unwrap();
        let back = read_artifact(&path).unwrap();

        assert_eq!(back, frame);
    }

    #[test]
    fn test_artifact_overwrite_is_wholesale() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("staging.json");

        write_artifact(&path, &sample_frame()).unwrap();

        let mut reduced = Frame::new(["page_content"]);
        reduced.push_row(vec![json!("only row")]).unwrap();
        write_artifact(&path, &reduced).unwrap();

        let back = read_artifact(&path).unwrap();
        assert_eq!(back.row_count(), 1);
    }

    #[test]
    fn test_no_tmp_residue_after_write() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("staging.json");

        write_artifact(&path, &sample_frame()).unwrap();

        assert!(!temp.child("staging.tmp").exists());
    }

    #[test]
    fn test_read_ragged_artifact_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("staging.json");
        file.write_str(r#"{"columns":["title","page_content"],"rows":[["only one value"]]}"#)
            .unwrap();

        let err = read_artifact(file.path()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_read_missing_artifact() {
        let err = read_artifact(Path::new("/nonexistent/staging.json")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_write_batches_names_files_by_pattern() {
        let temp = assert_fs::TempDir::new().unwrap();
        let batches = vec![
            Batch::new(0, vec![Document::new("a")], 1),
            Batch::new(1, vec![Document::new("b")], 1),
        ];

        let paths =
            write_batches(temp.path(), "batch_{index:03}.json", &batches).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(temp.child("batch_001.json").exists());
        assert!(temp.child("batch_002.json").exists());

        let docs: Vec<Document> =
            serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(docs[0].page_content, "a");
    }

    #[test]
    fn test_batch_filename_expansion() {
        assert_eq!(batch_filename("batch_{index:03}.json", 0), "batch_001.json");
        assert_eq!(batch_filename("batch_{index}.json", 9), "batch_10.json");
        assert_eq!(batch_filename("b_{index:02}.json", 9), "b_10.json");
    }
}
