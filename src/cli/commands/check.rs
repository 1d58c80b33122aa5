//! Output validation command.

use std::path::PathBuf;

use anyhow::Context;
use console::style;

use storyarc::config::Config;
use storyarc::llm::parse_segments;
use storyarc::output::{format_for_path, read_responses, OutputFormat};

use crate::cli::helpers::preview;

pub fn cmd_check(
    config: &Config,
    file: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> anyhow::Result<()> {
    let (path, format) = match file {
        Some(path) => {
            let format = format.unwrap_or_else(|| format_for_path(&path));
            (path, format)
        }
        None => (
            config.output_path(),
            format.unwrap_or_else(|| config.effective_output_format()),
        ),
    };

    let responses = read_responses(&path, format)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut valid = 0;
    for (i, response) in responses.iter().enumerate() {
        match parse_segments(response) {
            Ok(segments) => {
                valid += 1;
                let empty = segments.empty_phases();
                if !empty.is_empty() {
                    println!(
                        "{} Entry {}: empty {}",
                        style("!").yellow(),
                        i,
                        empty.join(", ")
                    );
                }
            }
            Err(e) => println!(
                "{} Entry {}: {} ({})",
                style("✗").red(),
                i,
                e,
                preview(response, 50)
            ),
        }
    }

    println!(
        "{} {} of {} entries in {} are four-phase segmentations",
        if valid == responses.len() {
            style("✓").green()
        } else {
            style("!").yellow()
        },
        valid,
        responses.len(),
        path.display()
    );
    Ok(())
}
