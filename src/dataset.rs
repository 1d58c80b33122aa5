//! Story dataset loading.
//!
//! Reads a CSV file with a header row and a `content` column. Other columns
//! are ignored. The narrative extractor runs on every row at load time.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::extract::extract_story;

/// Name of the column holding the raw story text.
pub const CONTENT_COLUMN: &str = "content";

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    /// 0-based data row index (header excluded).
    pub row: usize,
    /// Raw text as stored in the dataset.
    pub content: String,
    /// Narrative body produced by the extractor.
    pub story_only: String,
}

impl StoryRecord {
    pub fn new(row: usize, content: String) -> Self {
        let story_only = extract_story(&content);
        Self {
            row,
            content,
            story_only,
        }
    }

    /// Length of the extracted story in characters.
    pub fn story_chars(&self) -> usize {
        self.story_only.chars().count()
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Load every story from a CSV file.
pub fn load_stories(path: &Path) -> Result<Vec<StoryRecord>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let stories = read_stories(file)?;
    info!("Loaded {} stories from {}", stories.len(), path.display());
    Ok(stories)
}

/// Load every story from CSV data.
pub fn read_stories<R: Read>(reader: R) -> Result<Vec<StoryRecord>, DatasetError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let column = csv
        .headers()?
        .iter()
        .position(|h| h.trim() == CONTENT_COLUMN)
        .ok_or(DatasetError::MissingColumn(CONTENT_COLUMN))?;

    let mut stories = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record?;
        let content = record.get(column).unwrap_or_default().to_string();
        let story = StoryRecord::new(row, content);
        debug!(
            "Row {}: {} raw chars, {} extracted",
            row,
            story.content.chars().count(),
            story.story_chars()
        );
        stories.push(story);
    }

    Ok(stories)
}
