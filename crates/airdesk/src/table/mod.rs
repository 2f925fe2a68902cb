//! Table codec for airdesk.
//!
//! A table is a UTF-8 comma-separated file whose first row is the header.
//! Inserts append a single row; deletes rewrite the whole file through a
//! temporary sibling that is renamed into place.

pub mod schema;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use schema::TableSchema;

/// One table file on disk.
#[derive(Debug)]
pub struct Table {
    /// Path to the table file.
    path: PathBuf,
    /// Expected header and arity.
    schema: &'static TableSchema,
}

impl Table {
    /// Open the table at `path`, creating it with its header row if it is
    /// missing or empty.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, read or written.
    pub fn open(path: impl AsRef<Path>, schema: &'static TableSchema) -> Result<Self> {
        let table = Self {
            path: path.as_ref().to_path_buf(),
            schema,
        };

        let is_empty = match std::fs::metadata(&table.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(Error::storage(&table.path, e)),
        };

        if is_empty {
            table.write_all(&[table.header()])?;
            info!(
                "Created {} table at {}",
                schema.name,
                table.path.display()
            );
        } else {
            table.check_header()?;
        }

        Ok(table)
    }

    /// Get the path to the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the table's schema.
    #[must_use]
    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// The header row this table is created with.
    #[must_use]
    pub fn header(&self) -> StringRecord {
        StringRecord::from(self.schema.columns.to_vec())
    }

    /// Read the whole table, header row first.
    ///
    /// Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the file cannot be opened or
    /// read, and [`Error::MalformedTable`] if it is not valid CSV.
    pub fn read_all(&self) -> Result<Vec<StringRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| Error::from_csv(&self.path, e))?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| Error::from_csv(&self.path, e))?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            rows.push(row);
        }

        debug!("Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Replace the table's entire contents with `rows`.
    ///
    /// The rows are written to a temporary file in the same directory, synced,
    /// and renamed over the table, so readers see either the old or the new
    /// contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn write_all(&self, rows: &[StringRecord]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::storage(&self.path, e))?;

        {
            let mut writer = Self::writer(tmp.as_file_mut());
            for row in rows {
                writer
                    .write_record(row)
                    .map_err(|e| Error::from_csv(&self.path, e))?;
            }
            writer.flush().map_err(|e| Error::storage(&self.path, e))?;
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::storage(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::storage(&self.path, e.error))?;

        debug!("Rewrote {} with {} rows", self.path.display(), rows.len());
        Ok(())
    }

    /// Append one row at the end of the table without reading the rest.
    ///
    /// If the file's last line is missing its newline (a hand-edited file),
    /// the line is terminated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append_row(&self, row: &StringRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::storage(&self.path, e))?;

        if !ends_with_newline(&mut file).map_err(|e| Error::storage(&self.path, e))? {
            file.write_all(b"\n")
                .map_err(|e| Error::storage(&self.path, e))?;
        }

        let mut writer = Self::writer(&mut file);
        writer
            .write_record(row)
            .map_err(|e| Error::from_csv(&self.path, e))?;
        writer.flush().map_err(|e| Error::storage(&self.path, e))?;

        debug!("Appended row to {}", self.path.display());
        Ok(())
    }

    fn writer<W: Write>(inner: W) -> csv::Writer<W> {
        WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner)
    }

    /// Warn if an existing file's header differs from the schema.
    fn check_header(&self) -> Result<()> {
        let rows = self.read_all()?;
        if let Some(first) = rows.first() {
            if *first != self.header() {
                warn!(
                    "Unexpected header in {}: {:?}, expected {:?}",
                    self.path.display(),
                    first.iter().collect::<Vec<_>>(),
                    self.schema.columns
                );
            }
        }
        Ok(())
    }
}

/// Whether `file` is empty or its last byte is a newline.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
