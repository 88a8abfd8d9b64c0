//! Delimited dataset loader.
//!
//! Sources are either remote (`http://`, `https://`, one blocking GET, no
//! retry, no cache) or local (`file://` URLs and plain paths). Every failure to
//! obtain or parse the table is a `SourceUnavailable` error.
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::data_handling::{Cell, Dataset};
use crate::error::{PipelineError, Result};

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Remote(String),
    Local(PathBuf),
}

impl DataSource {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Remote(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            DataSource::Local(PathBuf::from(path))
        } else {
            DataSource::Local(PathBuf::from(trimmed))
        }
    }

    /// Tab for `.tsv` sources, comma otherwise.
    pub fn delimiter(&self) -> u8 {
        let name = match self {
            DataSource::Remote(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            DataSource::Local(path) => path.to_string_lossy().to_string(),
        };
        if name.to_ascii_lowercase().ends_with(".tsv") {
            b'\t'
        } else {
            b','
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Remote(url) => write!(f, "{}", url),
            DataSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch and parse the dataset at `location`.
pub fn load_dataset(location: &str) -> Result<Dataset> {
    let source = DataSource::parse(location);
    log::info!("Fetching dataset from {}", source);

    let bytes = match &source {
        DataSource::Remote(url) => fetch_remote(url)?,
        DataSource::Local(path) => read_local(path)?,
    };
    log::debug!("Read {} bytes from {}", bytes.len(), source);

    read_delimited(bytes.as_slice(), source.delimiter())
}

fn fetch_remote(url: &str) -> Result<Vec<u8>> {
    let mut response = reqwest::blocking::get(url)
        .map_err(|e| PipelineError::SourceUnavailable(format!("GET {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::SourceUnavailable(format!(
            "GET {} returned HTTP {}",
            url, status
        )));
    }

    let mut body = Vec::new();
    response.read_to_end(&mut body).map_err(|e| {
        PipelineError::SourceUnavailable(format!("Failed to read response body from {}: {}", url, e))
    })?;
    Ok(body)
}

fn read_local(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        PipelineError::SourceUnavailable(format!("Failed to open {}: {}", path.display(), e))
    })
}

/// Parse delimited text with a mandatory header row into a `Dataset`.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::SourceUnavailable(format!("Failed to read header row: {}", e)))?
        .clone();
    let headers = normalize_headers(&headers)?;

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::SourceUnavailable(format!("Failed to read row {}: {}", row_idx + 1, e))
        })?;
        rows.push(record.iter().map(Cell::parse).collect::<Vec<Cell>>());
    }

    if rows.is_empty() {
        return Err(PipelineError::SourceUnavailable(
            "Dataset contains a header but no data rows".to_string(),
        ));
    }

    Dataset::new(headers, rows)
}

fn normalize_headers(headers: &StringRecord) -> Result<Vec<String>> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    if names.is_empty() || names.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::SourceUnavailable(
            "Dataset has no header row".to_string(),
        ));
    }
    if let Some(pos) = names.iter().position(|h| h.is_empty()) {
        return Err(PipelineError::SourceUnavailable(format!(
            "Header column {} has no name",
            pos + 1
        )));
    }
    Ok(names)
}
