//! Service layer for story processing.

pub mod annotation;

pub use annotation::{
    AnnotationError, AnnotationEvent, AnnotationService, AnnotationSummary, StoryAnnotator,
};
