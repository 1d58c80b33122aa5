//! Persistence of annotation results.
//!
//! Two formats are supported:
//! - `json`: a single pretty-printed JSON array of response strings,
//!   rewritten in full after every success.
//! - `jsonl`: one JSON object per line, appended and flushed per success.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of response strings
    #[default]
    Json,
    /// One JSON record per line
    Jsonl,
}

/// One successful annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Dataset row the story came from.
    pub row: usize,
    /// 1-based position in the processed range.
    pub story: usize,
    /// Raw response text.
    pub response: String,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl OutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        OutputError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        OutputError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for successful annotations.
pub trait AnnotationSink {
    /// Persist one record. Returns only after the record is on disk.
    fn record(&mut self, record: &AnnotationRecord) -> Result<(), OutputError>;

    /// Number of entries the output holds.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps all responses in memory and rewrites the whole array on each record.
///
/// Each rewrite goes to a temporary file in the target directory that is
/// then renamed over the target, so the file always holds a complete array.
pub struct JsonArraySink {
    path: PathBuf,
    entries: Vec<String>,
}

impl JsonArraySink {
    /// Start with an empty array. Nothing is written until the first record.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Start from the entries of an existing array, if the file exists.
    pub fn append(path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let path = path.into();
        let entries = if path.exists() {
            read_json_array(&path)?
        } else {
            Vec::new()
        };
        debug!("Appending to {} ({} existing)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    fn write_all(&self) -> Result<(), OutputError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| OutputError::io(&self.path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.entries)
                .map_err(|e| OutputError::json(&self.path, e))?;
            writer.flush().map_err(|e| OutputError::io(&self.path, e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| OutputError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl AnnotationSink for JsonArraySink {
    /// A failed rewrite keeps the entry, so the next successful rewrite
    /// persists it.
    fn record(&mut self, record: &AnnotationRecord) -> Result<(), OutputError> {
        self.entries.push(record.response.clone());
        self.write_all()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Appends one JSON record per line.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
    count: usize,
}

impl JsonLinesSink {
    /// Open `path` for appending, or truncate it when `append` is false.
    pub fn open(path: impl Into<PathBuf>, append: bool) -> Result<Self, OutputError> {
        let path = path.into();
        let count = if append && path.exists() {
            read_json_lines(&path)?.len()
        } else {
            0
        };
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|e| OutputError::io(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            count,
        })
    }
}

impl AnnotationSink for JsonLinesSink {
    fn record(&mut self, record: &AnnotationRecord) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| OutputError::json(&self.path, e))?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| OutputError::io(&self.path, e))?;
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }
}

/// Open the sink for `format`.
pub fn open_sink(
    path: &Path,
    format: OutputFormat,
    append: bool,
) -> Result<Box<dyn AnnotationSink + Send>, OutputError> {
    Ok(match format {
        OutputFormat::Json if append => Box::new(JsonArraySink::append(path)?),
        OutputFormat::Json => Box::new(JsonArraySink::create(path)),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::open(path, append)?),
    })
}

fn read_json_array(path: &Path) -> Result<Vec<String>, OutputError> {
    let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| OutputError::json(path, e))
}

fn read_json_lines(path: &Path) -> Result<Vec<AnnotationRecord>, OutputError> {
    let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| OutputError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line).map_err(|e| OutputError::json(path, e))?);
    }
    Ok(records)
}

/// Read the response texts back from an output file.
pub fn read_responses(path: &Path, format: OutputFormat) -> Result<Vec<String>, OutputError> {
    match format {
        OutputFormat::Json => read_json_array(path),
        OutputFormat::Jsonl => Ok(read_json_lines(path)?
            .into_iter()
            .map(|r| r.response)
            .collect()),
    }
}

/// Guess the format from the file extension.
pub fn format_for_path(path: &Path) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") | Some("ndjson") => OutputFormat::Jsonl,
        _ => OutputFormat::Json,
    }
}
