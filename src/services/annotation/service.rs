//! Story annotation service.
//!
//! Walks the dataset in order, skips stories over the size gate, sends the
//! rest to a [`StoryAnnotator`], and records each success in a sink.
//! A failed call or write skips the story; only a credential failure with
//! halting enabled ends the run. Progress is reported through events.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::dataset::StoryRecord;
use crate::llm::{parse_segments, LlmError};
use crate::output::{AnnotationRecord, AnnotationSink};

use super::annotator::StoryAnnotator;
use super::types::{AnnotationError, AnnotationEvent, AnnotationSummary};

/// Service for annotating stories with an LLM.
pub struct AnnotationService<A> {
    annotator: A,
    instructions: String,
    pipeline: PipelineConfig,
}

impl<A: StoryAnnotator> AnnotationService<A> {
    /// Create a new annotation service.
    pub fn new(annotator: A, instructions: impl Into<String>, pipeline: PipelineConfig) -> Self {
        Self {
            annotator,
            instructions: instructions.into(),
            pipeline,
        }
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Stories selected by `start_row` and `limit`.
    pub fn selected<'a>(&self, stories: &'a [StoryRecord]) -> &'a [StoryRecord] {
        let start = self.pipeline.start_row.min(stories.len());
        let rest = &stories[start..];
        if self.pipeline.limit > 0 && self.pipeline.limit < rest.len() {
            &rest[..self.pipeline.limit]
        } else {
            rest
        }
    }

    /// Whether a story passes the size gate.
    pub fn fits(&self, story: &StoryRecord) -> bool {
        story.story_chars() <= self.pipeline.char_limit
    }

    /// Annotate the selected stories, recording each success in `sink`.
    pub async fn run(
        &self,
        stories: &[StoryRecord],
        sink: &mut (dyn AnnotationSink + Send),
        event_tx: mpsc::Sender<AnnotationEvent>,
    ) -> Result<AnnotationSummary, AnnotationError> {
        let selected = self.selected(stories);
        let mut summary = AnnotationSummary::default();

        let _ = event_tx
            .send(AnnotationEvent::Started {
                total_stories: selected.len(),
            })
            .await;
        info!(
            "Annotating {} stories starting at row {} with {}",
            selected.len(),
            self.pipeline.start_row,
            self.annotator.display_name()
        );

        for (offset, record) in selected.iter().enumerate() {
            let story = offset + 1;
            let chars = record.story_chars();

            if !self.fits(record) {
                info!("Skipping story {}: too long ({} chars)", story, chars);
                summary.skipped += 1;
                let _ = event_tx
                    .send(AnnotationEvent::StorySkipped {
                        story,
                        row: record.row,
                        chars,
                    })
                    .await;
                continue;
            }

            info!("Processing story {}...", story);
            let _ = event_tx
                .send(AnnotationEvent::StoryStarted {
                    story,
                    row: record.row,
                    chars,
                })
                .await;

            let response = match self.annotate_with_retry(&record.story_only).await {
                Ok(response) => response,
                Err(e) => {
                    info!("Error on story {}: {}", story, e);
                    summary.failed += 1;
                    let _ = event_tx
                        .send(AnnotationEvent::StoryFailed {
                            story,
                            row: record.row,
                            error: e.to_string(),
                        })
                        .await;
                    if e.is_credential() && self.pipeline.halt_on_credential_error {
                        self.send_complete(&event_tx, &summary).await;
                        return Err(AnnotationError::Credential { story, source: e });
                    }
                    continue;
                }
            };

            let entry = AnnotationRecord {
                row: record.row,
                story,
                response,
            };
            if let Err(e) = sink.record(&entry) {
                info!("Error on story {}: {}", story, e);
                summary.failed += 1;
                let _ = event_tx
                    .send(AnnotationEvent::StoryFailed {
                        story,
                        row: record.row,
                        error: e.to_string(),
                    })
                    .await;
                continue;
            }

            if let Err(e) = parse_segments(&entry.response) {
                debug!("Story {} response is not a four-phase segmentation: {}", story, e);
                summary.malformed += 1;
            }

            summary.succeeded += 1;
            let _ = event_tx
                .send(AnnotationEvent::StoryCompleted {
                    story,
                    row: record.row,
                })
                .await;
        }

        self.send_complete(&event_tx, &summary).await;
        info!(
            "Finished: {} succeeded, {} failed, {} skipped",
            summary.succeeded, summary.failed, summary.skipped
        );
        Ok(summary)
    }

    async fn send_complete(
        &self,
        event_tx: &mpsc::Sender<AnnotationEvent>,
        summary: &AnnotationSummary,
    ) {
        let _ = event_tx
            .send(AnnotationEvent::Complete {
                succeeded: summary.succeeded,
                failed: summary.failed,
                skipped: summary.skipped,
            })
            .await;
    }

    /// Call the annotator, retrying transient failures with exponential backoff.
    async fn annotate_with_retry(&self, story: &str) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.annotator.annotate(&self.instructions, story).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.pipeline.retries => {
                    let wait = retry_delay(&e, attempt, self.pipeline.retry_delay_ms);
                    warn!("{} (attempt {}), retrying in {:?}", e, attempt + 1, wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Giving up after {} attempt(s)", attempt + 1);
                    return Err(e);
                }
            }
        }
    }
}

/// Longest wait between attempts, whatever the server asks for.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff: `base_ms * 2^attempt`, capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_RETRY_DELAY)
}

/// Server-requested delay if any, else backoff. Both are capped.
fn retry_delay(err: &LlmError, attempt: u32, base_ms: u64) -> Duration {
    err.retry_after()
        .map(|d| d.min(MAX_RETRY_DELAY))
        .unwrap_or_else(|| backoff_delay(attempt, base_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0, 1000), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2, 1000), Duration::from_millis(4000));
        assert_eq!(backoff_delay(10, 1000), Duration::from_secs(60));
        assert_eq!(backoff_delay(70, 1000), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let err = LlmError::RateLimited {
            retry_after_secs: Some(3600),
        };
        assert_eq!(retry_delay(&err, 0, 1000), Duration::from_secs(60));

        let err = LlmError::RateLimited {
            retry_after_secs: Some(5),
        };
        assert_eq!(retry_delay(&err, 3, 1000), Duration::from_secs(5));

        let err = LlmError::Connection("reset".to_string());
        assert_eq!(retry_delay(&err, 1, 250), Duration::from_millis(500));
    }
}
