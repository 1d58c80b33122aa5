//! storyarc - narrative-arc annotation for public-domain short stories.
//!
//! Cleans transcribed stories down to their narrative body and asks an LLM
//! to segment each one into beginning, rising action, climax, and falling
//! action.

pub mod config;
pub mod dataset;
pub mod extract;
pub mod llm;
pub mod output;
pub mod services;

pub use dataset::{load_stories, StoryRecord};
pub use extract::extract_story;
