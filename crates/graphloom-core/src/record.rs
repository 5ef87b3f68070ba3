//! Record sources
//!
//! A [`RecordSource`] turns a location identifier into a lazy, finite,
//! non-restartable stream of flat field-value records. Each load step opens its
//! source afresh, so a retried run always re-reads from the first row.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::SourceError;

/// One flat row from a record source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    /// Position of this row in its source, for skip reporting
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Raw text of a field; extra fields are simply never asked for
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Lazy sequence of records; row-level failures arrive as `SourceError::Row`
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, SourceError>> + Send>;

/// Capability to read records from a location
pub trait RecordSource: Send + Sync {
    /// Open a fresh stream positioned at the first record
    fn open(&self, location: &str) -> Result<RecordStream, SourceError>;
}

/// Reads headed CSV files from local paths or `file://` URIs
#[derive(Debug, Clone, Default)]
pub struct CsvRecordSource {
    base_dir: Option<PathBuf>,
}

impl CsvRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, SourceError> {
        let raw = if let Some(rest) = location.strip_prefix("file://") {
            rest
        } else if location.contains("://") {
            return Err(SourceError::Unsupported(location.to_string()));
        } else {
            location
        };

        let path = Path::new(raw);
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl RecordSource for CsvRecordSource {
    fn open(&self, location: &str) -> Result<RecordStream, SourceError> {
        let path = self.resolve(location)?;
        let file = File::open(&path).map_err(|e| SourceError::Open {
            location: location.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| SourceError::Open {
                location: location.to_string(),
                reason: format!("failed to read CSV headers: {}", e),
            })?
            .clone();

        Ok(Box::new(CsvRecords {
            location: location.to_string(),
            headers,
            rows: reader.into_records(),
            done: false,
        }))
    }
}

struct CsvRecords {
    location: String,
    headers: csv::StringRecord,
    rows: csv::StringRecordsIntoIter<File>,
    done: bool,
}

impl Iterator for CsvRecords {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.rows.next()? {
            Ok(row) => {
                let line = row.position().map(|p| p.line()).unwrap_or_default();
                let fields = self
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(header, value)| (header.to_string(), value.to_string()))
                    .collect();
                Some(Ok(Record::new(line, fields)))
            }
            Err(err) => {
                if let csv::ErrorKind::Io(io) = err.kind() {
                    // The underlying reader is broken; nothing after this is trustworthy
                    self.done = true;
                    return Some(Err(SourceError::Read {
                        location: self.location.clone(),
                        reason: io.to_string(),
                    }));
                }
                let line = err.position().map(|p| p.line()).unwrap_or_default();
                Some(Err(SourceError::Row {
                    location: self.location.clone(),
                    line,
                    reason: err.to_string(),
                }))
            }
        }
    }
}

/// Named in-memory tables, addressed by location
#[derive(Debug, Default)]
pub struct InMemoryRecordSource {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table; rows are positional against `headers`
    pub fn add_table(&self, location: &str, headers: &[&str], rows: &[&[&str]]) {
        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let fields = headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect();
                // Line 1 is the header row, matching CSV numbering
                Record::new(idx as u64 + 2, fields)
            })
            .collect();
        self.tables.write().insert(location.to_string(), records);
    }

    pub fn with_table(self, location: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        self.add_table(location, headers, rows);
        self
    }
}

impl RecordSource for InMemoryRecordSource {
    fn open(&self, location: &str) -> Result<RecordStream, SourceError> {
        let records = self
            .tables
            .read()
            .get(location)
            .cloned()
            .ok_or_else(|| SourceError::Open {
                location: location.to_string(),
                reason: "no such table".to_string(),
            })?;
        Ok(Box::new(records.into_iter().map(Ok)))
    }
}
