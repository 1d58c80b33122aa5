//! Extraction inspection command.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use console::style;
use serde::Serialize;

use storyarc::config::Config;
use storyarc::dataset::load_stories;

use crate::cli::helpers::preview;

#[derive(Serialize)]
struct ExtractedStory<'a> {
    row: usize,
    chars: usize,
    story: &'a str,
}

pub fn cmd_extract(
    config: &Config,
    dataset: Option<PathBuf>,
    row: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dataset_path = dataset.unwrap_or_else(|| config.dataset_path());
    let stories = load_stories(&dataset_path)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;
    let char_limit = config.pipeline.char_limit;

    if let Some(row) = row {
        let story = stories
            .get(row)
            .with_context(|| format!("Row {} out of range ({} rows)", row, stories.len()))?;
        println!("{}", story.story_only);
        eprintln!(
            "{} Row {}: {} raw chars -> {} extracted chars",
            style("→").cyan(),
            row,
            story.content.chars().count(),
            story.story_chars()
        );
        return Ok(());
    }

    let over_limit = stories
        .iter()
        .filter(|s| s.story_chars() > char_limit)
        .count();

    if let Some(path) = output {
        let entries: Vec<_> = stories
            .iter()
            .map(|s| ExtractedStory {
                row: s.row,
                chars: s.story_chars(),
                story: &s.story_only,
            })
            .collect();
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &entries)?;
        writer.flush()?;
        println!(
            "{} Wrote {} cleaned stories to {}",
            style("✓").green(),
            entries.len(),
            path.display()
        );
    } else {
        println!("{:>6}  {:>8}  {:>8}  {}", "ROW", "RAW", "STORY", "OPENING");
        for story in &stories {
            let marker = if story.story_chars() > char_limit {
                style("!").yellow().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "{:>6}  {:>8}  {:>8}{} {}",
                story.row,
                story.content.chars().count(),
                story.story_chars(),
                marker,
                preview(&story.story_only, 60)
            );
        }
    }

    println!(
        "{} {} of {} stories exceed the {} character limit",
        if over_limit > 0 {
            style("!").yellow()
        } else {
            style("✓").green()
        },
        over_limit,
        stories.len(),
        char_limit
    );
    Ok(())
}
