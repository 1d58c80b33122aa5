//! Types shared by the annotation service and its consumers.

use thiserror::Error;

use crate::llm::LlmError;

/// Events emitted during annotation processing.
/// Used by the CLI to drive progress bars and status messages.
#[derive(Debug, Clone)]
pub enum AnnotationEvent {
    Started {
        total_stories: usize,
    },
    StoryStarted {
        story: usize,
        row: usize,
        chars: usize,
    },
    StoryCompleted {
        story: usize,
        row: usize,
    },
    StorySkipped {
        story: usize,
        row: usize,
        chars: usize,
    },
    StoryFailed {
        story: usize,
        row: usize,
        error: String,
    },
    Complete {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Result of an annotation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Responses that did not parse as a four-phase segmentation.
    pub malformed: usize,
}

impl AnnotationSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Errors that stop an annotation run early.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Stopped at story {story}: {source}")]
    Credential {
        story: usize,
        #[source]
        source: LlmError,
    },
}
