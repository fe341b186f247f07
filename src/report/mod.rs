//! Tabular report building
//!
//! Turns a fetch outcome into a one-sheet `.xlsx` file: a header row taken from the first
//! record's keys and one row per record, a placeholder row when there is nothing to show, or
//! a single cell with the failure details when the fetch failed.

use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::fetch::{FetchError, FetchResult};
use crate::mail::Attachment;
use crate::types::Record;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod xlsx;

pub use xlsx::{Cell, MAX_SHEET_NAME_LEN};

/// Text of the single row written for an empty dataset
pub const NO_DATA_PLACEHOLDER: &str = "No data available";

/// What a report is built from
#[derive(Clone, Copy, Debug)]
pub enum ReportData<'a> {
    /// Records in fetch order
    Records(&'a [Record]),
    /// The failure that prevented fetching any records
    Failure(&'a FetchError),
}

impl<'a> From<&'a FetchResult> for ReportData<'a> {
    fn from(result: &'a FetchResult) -> Self {
        match result {
            Ok(records) => ReportData::Records(records),
            Err(failure) => ReportData::Failure(failure),
        }
    }
}

/// A report that has been written to disk
#[derive(Clone, Debug)]
pub struct Report {
    /// Sheet title
    pub title: String,
    /// Sheet rows, header first
    pub rows: Vec<Vec<Cell>>,
    /// Absolute path of the written file
    pub path: PathBuf,
}

impl Report {
    /// File name component of [`Report::path`]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Read the written file as an email attachment
    pub async fn to_attachment(&self) -> Result<Attachment> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::Report(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(Attachment {
            content,
            filename: self.file_name(),
        })
    }

    /// Delete the written file
    pub async fn remove(&self) -> Result<()> {
        tokio::fs::remove_file(&self.path).await.map_err(|e| {
            Error::Report(format!("failed to delete {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), "Removed report file");
        Ok(())
    }
}

/// Writes reports into one output directory
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    output_dir: PathBuf,
}

impl ReportBuilder {
    /// Builder writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Builder for the configured output directory
    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    /// Directory reports are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the sheet for `data` and write it to `{output_dir}/{file_name}`
    ///
    /// `file_name` must be a bare file name. The caller owns the written file.
    pub fn build(&self, title: &str, data: ReportData<'_>, file_name: &str) -> Result<Report> {
        if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
            return Err(Error::Validation(format!(
                "report file name '{}' must not contain a path",
                file_name
            )));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = std::path::absolute(self.output_dir.join(file_name))?;
        let rows = sheet_rows(data);
        let title = xlsx::sanitize_sheet_name(title);

        xlsx::write_workbook(&path, &title, &rows)?;
        info!(
            path = %path.display(),
            rows = rows.len(),
            "Report written"
        );

        Ok(Report { title, rows, path })
    }
}

/// Rows of the sheet for `data`, header first
pub fn sheet_rows(data: ReportData<'_>) -> Vec<Vec<Cell>> {
    let records = match data {
        ReportData::Failure(failure) => {
            return vec![vec![Cell::Text(failure.details.clone())]];
        }
        ReportData::Records(records) => records,
    };

    // A key-less first record has no header to offer
    let Some(first) = records.first().filter(|r| !r.is_empty()) else {
        return vec![vec![Cell::Text(NO_DATA_PLACEHOLDER.to_string())]];
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(headers.iter().map(|h| Cell::Text((*h).clone())).collect());
    for record in records {
        rows.push(
            headers
                .iter()
                .map(|h| record.get(*h).map(to_cell).unwrap_or(Cell::Empty))
                .collect(),
        );
    }
    rows
}

/// Read a written report back as rows of cell text
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    xlsx::read_sheet(path)
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => Cell::Number(n.to_string()),
        Value::String(s) => Cell::Text(s.clone()),
        nested => Cell::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests;
