//! CSV data log, one row per control call.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Writer, WriterBuilder};
use tb_core::Real;

use crate::error::{ControlError, ControlResult};

/// Comma-separated log with a quoted header line.
///
/// Each row is flushed as soon as it is written so that a run that gets
/// killed keeps everything up to its last control.
#[derive(Debug)]
pub struct DataLog {
    path: PathBuf,
    writer: Writer<File>,
}

impl DataLog {
    /// Create (or truncate) `path` and write the header.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::DataLog`] if the file cannot be created or
    /// written.
    pub fn create(path: impl AsRef<Path>, columns: &[String]) -> ControlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let fail = |source: io::Error| ControlError::DataLog {
            path: path.clone(),
            source,
        };
        let mut file = File::create(&path).map_err(fail)?;

        // Header fields are always quoted, row fields only when needed.
        let mut header = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(&mut file);
        header
            .write_record(columns)
            .map_err(io::Error::from)
            .and_then(|()| header.flush())
            .map_err(fail)?;
        drop(header);

        let writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_row(&mut self, row: &LogRow) -> ControlResult<()> {
        self.writer
            .write_record(&row.fields)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.flush())
            .map_err(|source| ControlError::DataLog {
                path: self.path.clone(),
                source,
            })
    }
}

/// Fields of one log row, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRow {
    fields: Vec<String>,
}

impl LogRow {
    /// Row starting with a seconds-since-epoch timestamp.
    pub fn stamped(ts: i64) -> Self {
        Self {
            fields: vec![ts.to_string()],
        }
    }

    pub fn real(&mut self, value: Real) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn count(&mut self, value: u64) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}
