//! Artifact I/O shared by every stage.
//!
//! Serialized objects are bincode files; tabular data is CSV. Each artifact
//! type has exactly one format, used by both its writer and its readers.

use crate::error::RecommenderResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> RecommenderResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Serialize `value` to `path` with bincode.
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> RecommenderResult<()> {
    ensure_parent_dir(path)?;
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    debug!(path = %path.display(), "Saved serialized object");
    Ok(())
}

/// Deserialize a bincode object previously written by [`save_object`].
pub fn load_object<T: DeserializeOwned>(path: &Path) -> RecommenderResult<T> {
    let reader = BufReader::new(File::open(path)?);
    let value = bincode::deserialize_from(reader)?;
    debug!(path = %path.display(), "Loaded serialized object");
    Ok(value)
}

/// Read every row of a headed CSV file.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, and
/// rows with a differing number of fields are tolerated.
pub fn read_csv<T: DeserializeOwned>(path: &Path, delimiter: u8) -> RecommenderResult<Vec<T>> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    debug!(path = %path.display(), rows = rows.len(), "Read CSV");
    Ok(rows)
}

/// Write `rows` as a headed, comma-separated CSV file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> RecommenderResult<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
