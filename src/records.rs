//! # Secret Records
//!
//! Reads the `name,value` CSV input into an ordered list of [`SecretRecord`]s.
//!
//! Parsing is all-or-nothing: a bad header or a row with the wrong number of
//! fields fails the whole file and no records are returned. Names and values
//! are taken verbatim (only CSV quoting is interpreted), and values are kept as
//! raw bytes that are zeroed when the record is dropped.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use zeroize::Zeroizing;

/// Column names expected in the header row, in order
pub const HEADER: [&str; 2] = ["name", "value"];

/// Errors raised while reading the secrets file
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The file could not be opened or read
    #[error("unable to open file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input contained no header row
    #[error("CSV header is missing; expected 'name,value'")]
    MissingHeader,

    /// The header row did not read `name,value`
    #[error("CSV header must be 'name,value', got '{found}'")]
    InvalidHeader { found: String },

    /// A row had the wrong number of fields
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount { line: u64, expected: usize, found: usize },

    /// A secret name was not valid UTF-8
    #[error("line {line}: secret name is not valid UTF-8")]
    InvalidName { line: u64 },

    /// Low-level CSV syntax or read error
    #[error("unable to read CSV record: {0}")]
    Csv(#[from] csv::Error),
}

/// One secret to provision: the container name and the payload for its new version
#[derive(Clone)]
pub struct SecretRecord {
    name: String,
    value: Zeroizing<Vec<u8>>,
}

impl SecretRecord {
    /// Create a record from a name and raw value bytes
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), value: Zeroizing::new(value.into()) }
    }

    /// Secret identifier in the backend
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload bytes. Never log the result.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl PartialEq for SecretRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value() == other.value()
    }
}

impl Eq for SecretRecord {}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Open `path` and parse it as a secrets CSV.
///
/// The file handle is dropped before returning, on success and on error.
pub fn read_secrets_file(path: &Path) -> Result<Vec<SecretRecord>, FormatError> {
    let file = File::open(path)
        .map_err(|source| FormatError::Io { path: path.to_path_buf(), source })?;

    debug!(path = %path.display(), "Reading secrets file");

    parse_records(file)
}

/// Parse a secrets CSV from any reader, preserving row order.
pub fn parse_records<R: Read>(source: R) -> Result<Vec<SecretRecord>, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        // arity is checked here so the error can name the line
        .flexible(true)
        .from_reader(source);

    let mut rows = reader.byte_records();

    let header = rows.next().ok_or(FormatError::MissingHeader)??;
    validate_header(&header)?;

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let line = row.position().map(|pos| pos.line()).unwrap_or_default();

        if row.len() != HEADER.len() {
            return Err(FormatError::FieldCount {
                line,
                expected: HEADER.len(),
                found: row.len(),
            });
        }

        let name = std::str::from_utf8(&row[0]).map_err(|_| FormatError::InvalidName { line })?;
        records.push(SecretRecord::new(name, &row[1]));
    }

    Ok(records)
}

fn validate_header(header: &csv::ByteRecord) -> Result<(), FormatError> {
    let cells: Vec<String> =
        header.iter().map(|cell| String::from_utf8_lossy(cell).into_owned()).collect();

    let matches = cells.len() == HEADER.len()
        && cells.iter().zip(HEADER).all(|(cell, expected)| cell.to_lowercase() == expected);

    if matches {
        Ok(())
    } else {
        Err(FormatError::InvalidHeader { found: cells.join(",") })
    }
}
