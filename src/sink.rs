use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use csv::WriterBuilder;
use tracing::info;

use crate::{
    encode::EncodedRecord,
    error::{CalendarResult, IoError},
};

pub const CSV_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

const BUFFER_SIZE: usize = 64 * 1024;

/// Writes encoded records as CSV.
///
/// The file is written next to the target under a temporary name and renamed
/// into place, so an existing file is either fully replaced or left untouched.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of data rows written.
    #[tracing::instrument(skip(self, records), fields(path = %self.path.display()), err)]
    pub fn write(&self, records: &[EncodedRecord]) -> CalendarResult<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IoError::WriterCreation(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let tmp_path = self.tmp_path();
        let result = write_csv(&tmp_path, records).and_then(|count| {
            std::fs::rename(&tmp_path, &self.path).map_err(|e| {
                IoError::WriteFailed(format!(
                    "Failed to move {} into place: {e}",
                    tmp_path.display()
                ))
            })?;
            Ok(count)
        });

        if result.is_err() {
            // Best effort; the original error is what matters.
            let _ = std::fs::remove_file(&tmp_path);
        }

        let count = result?;
        info!(rows = count, "Wrote calendar CSV");
        Ok(count)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_csv(path: &Path, records: &[EncodedRecord]) -> CalendarResult<usize> {
    let file = File::create(path).map_err(|e| {
        IoError::WriterCreation(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(BUFFER_SIZE, file));

    // Written explicitly so an empty run still produces a header.
    writer.write_record(CSV_COLUMNS).map_err(IoError::from)?;
    for record in records {
        writer.serialize(record).map_err(IoError::from)?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| IoError::WriteFailed(e.to_string()))?
        .into_inner()
        .map_err(|e| IoError::WriteFailed(e.to_string()))?;
    file.sync_all().map_err(IoError::from)?;
    Ok(records.len())
}
