//! CSV export
//!
//! Header row is `PathRecord::COLUMNS`; missing values are empty cells and
//! timestamps are RFC 3339.

use super::RecordSink;
use crate::error::{ExportError, ExportResult};
use crate::fs::PathRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl CsvExporter<File> {
    /// Create (or truncate) a CSV file and write the header
    pub fn create(path: &Path) -> ExportResult<Self> {
        let file = File::create(path).map_err(|e| ExportError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvExporter<W> {
    /// Wrap any writer and emit the header
    pub fn from_writer(inner: W) -> ExportResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(PathRecord::COLUMNS)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Data rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> ExportResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

impl<W: Write + Send + 'static> RecordSink for CsvExporter<W> {
    fn write_batch(&mut self, batch: &[PathRecord]) -> ExportResult<usize> {
        for record in batch {
            self.writer.write_record(record.to_row())?;
        }
        self.rows += batch.len() as u64;
        Ok(batch.len())
    }

    fn finish(&mut self) -> ExportResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn record(path: &str) -> PathRecord {
        let mut r = PathRecord::partial(Path::new(path), 1, "");
        r.error = None;
        r.size = Some(42);
        r
    }

    #[test]
    fn test_header_and_rows() {
        let mut exporter = CsvExporter::from_writer(Vec::new()).unwrap();
        exporter
            .write_batch(&[record("/a"), record("/b,with,commas")])
            .unwrap();
        exporter.finish().unwrap();
        assert_eq!(exporter.rows(), 2);

        let bytes = exporter.into_inner().unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers: Vec<_> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, PathRecord::COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "/b,with,commas");
        assert_eq!(&rows[0][3], "42");
        assert_eq!(&rows[0][9], "");
    }

    #[test]
    fn test_create_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut exporter = CsvExporter::create(&path).unwrap();
        exporter.write_batch(&[record("/a")]).unwrap();
        exporter.finish().unwrap();
        drop(exporter);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("path,path_hash,kind"));
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let err = CsvExporter::create(&dir.path().join("no/such/out.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, ExportError::CreateFailed { .. }));
    }
}
