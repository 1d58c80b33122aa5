//! Story annotation pipeline.

mod annotator;
mod service;
mod types;

pub use annotator::StoryAnnotator;
pub use service::AnnotationService;
pub use types::{AnnotationError, AnnotationEvent, AnnotationSummary};
