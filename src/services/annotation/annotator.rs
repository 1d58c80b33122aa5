//! Annotator trait: the boundary between the pipeline and the model service.

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};

/// A backend that turns a story into a segmentation response.
#[async_trait]
pub trait StoryAnnotator: Send + Sync {
    /// Human-readable name for CLI progress output.
    fn display_name(&self) -> String;

    /// Human-readable readiness summary or setup hint.
    fn availability_hint(&self) -> String {
        String::new()
    }

    /// Send one story with the given instructions and return the raw response text.
    async fn annotate(&self, instructions: &str, story: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl StoryAnnotator for LlmClient {
    fn display_name(&self) -> String {
        format!("{} ({})", self.config().provider.as_str(), self.config().model)
    }

    fn availability_hint(&self) -> String {
        self.config().availability_hint()
    }

    async fn annotate(&self, instructions: &str, story: &str) -> Result<String, LlmError> {
        self.complete(instructions, story).await
    }
}
