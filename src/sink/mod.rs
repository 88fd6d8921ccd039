//! Root-path result sink: the on-disk output document.
//!
//! Exactly one sink exists per run, owned by the root scope's consumer
//! task, which serializes every write — completed jobs from concurrent
//! workers never race on the file. Nested scopes bypass the sink entirely
//! and return their results in memory.

mod xml;

use crate::config::ExportFormat;
use crate::error::ScrapeError;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Base name of the output document; the extension follows the format.
pub const OUTPUT_STEM: &str = "output";

/// The aggregated output document, keyed by start URL.
pub type Document = BTreeMap<String, Value>;

pub struct Sink {
    format: ExportFormat,
    path: PathBuf,
    document: Document,
}

impl Sink {
    /// Path of the output document for `format` inside `dir`.
    pub fn output_path(dir: &Path, format: ExportFormat) -> PathBuf {
        dir.join(format!("{OUTPUT_STEM}.{}", format.extension()))
    }

    /// Create the sink and initialize the output file to an empty document.
    pub fn create(dir: &Path, format: ExportFormat) -> Result<Self, ScrapeError> {
        let path = Self::output_path(dir, format);
        let initial = match format {
            ExportFormat::Json => "{}".to_string(),
            ExportFormat::Xml => xml::empty_document(),
            ExportFormat::Csv => String::new(),
        };
        std::fs::write(&path, initial)
            .map_err(|e| ScrapeError::Sink(format!("initializing {}: {e}", path.display())))?;
        Ok(Sink {
            format,
            path,
            document: Document::new(),
        })
    }

    /// Record one completed root job and persist it.
    ///
    /// JSON and XML rewrite the whole document; CSV appends a single row of
    /// `[start_url, stringified output]`.
    pub fn record(&mut self, start_url: String, output: BTreeMap<String, Value>) -> Result<(), ScrapeError> {
        let value = Value::Map(output);
        let row = (start_url.clone(), value.to_compact_string());
        self.document.insert(start_url, value);

        match self.format {
            ExportFormat::Json => {
                let data = to_json_pretty(&self.document)?;
                std::fs::write(&self.path, data)
                    .map_err(|e| ScrapeError::Sink(format!("writing {}: {e}", self.path.display())))?;
            }
            ExportFormat::Xml => {
                let data = xml::document_to_xml(&self.document)?;
                std::fs::write(&self.path, data)
                    .map_err(|e| ScrapeError::Sink(format!("writing {}: {e}", self.path.display())))?;
            }
            ExportFormat::Csv => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| ScrapeError::Sink(format!("opening {}: {e}", self.path.display())))?;
                let mut writer = csv::Writer::from_writer(file);
                writer
                    .write_record([row.0.as_str(), row.1.as_str()])
                    .and_then(|_| writer.flush().map_err(csv::Error::from))
                    .map_err(|e| ScrapeError::Sink(format!("appending csv row: {e}")))?;
            }
        }
        Ok(())
    }

    /// The document accumulated so far.
    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// Pretty-print with a single-space indent.
fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, ScrapeError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ScrapeError::Sink(format!("serializing output: {e}")))?;
    String::from_utf8(buf).map_err(|e| ScrapeError::Sink(format!("serializing output: {e}")))
}
