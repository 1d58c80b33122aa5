//! Command-line interface for storyarc.

mod commands;
mod helpers;

pub use commands::{is_verbose, run};
