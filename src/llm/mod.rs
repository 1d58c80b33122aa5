//! LLM integration for narrative-arc segmentation.
//!
//! Sends cleaned stories to a hosted model and interprets the segmentation
//! it returns.

mod client;
pub mod segments;

pub use client::{
    error_for_status, LlmClient, LlmConfig, LlmError, LlmProvider, DEFAULT_SEGMENTATION_PROMPT,
};
pub use segments::{parse_segments, NarrativeSegments};
