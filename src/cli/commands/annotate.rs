//! Annotation command.

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use storyarc::config::Config;
use storyarc::dataset::load_stories;
use storyarc::llm::LlmClient;
use storyarc::output::{format_for_path, open_sink};
use storyarc::services::{AnnotationEvent, AnnotationService, StoryAnnotator};

use super::AnnotateArgs;

/// Clean the dataset and annotate each story with the LLM.
pub async fn cmd_annotate(mut config: Config, args: AnnotateArgs) -> anyhow::Result<()> {
    if let Some(start) = args.start {
        config.pipeline.start_row = start;
    }
    if let Some(limit) = args.limit {
        config.pipeline.limit = limit;
    }
    if let Some(char_limit) = args.char_limit {
        config.pipeline.char_limit = char_limit;
    }
    if let Some(retries) = args.retries {
        config.pipeline.retries = retries;
    }
    if let Some(ref m) = args.model {
        config.llm.model = m.clone();
    }
    if let Some(ref ep) = args.endpoint {
        config.llm.endpoint = Some(ep.clone());
    }

    let dataset_path = args.dataset.unwrap_or_else(|| config.dataset_path());
    let (output_path, format) = match args.output {
        Some(path) => {
            let format = args.format.unwrap_or_else(|| format_for_path(&path));
            (path, format)
        }
        None => (
            config.output_path(),
            args.format
                .unwrap_or_else(|| config.effective_output_format()),
        ),
    };

    println!("{} Start", style("→").cyan());
    let stories = load_stories(&dataset_path)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;
    println!(
        "{} Cleaned {} stories from {}",
        style("✓").green(),
        stories.len(),
        dataset_path.display()
    );

    let client = LlmClient::new(config.llm.clone())?;
    let instructions = client.config().get_instructions().to_string();
    println!(
        "{} Using {}",
        style("→").cyan(),
        client.availability_hint()
    );

    let service = AnnotationService::new(client, instructions, config.pipeline.clone());
    let mut sink = open_sink(&output_path, format, args.append)
        .with_context(|| format!("Failed to open output {}", output_path.display()))?;
    if !sink.is_empty() {
        println!(
            "{} Appending to {} ({} existing entries)",
            style("→").cyan(),
            output_path.display(),
            sink.len()
        );
    }

    let (event_tx, mut event_rx) = mpsc::channel::<AnnotationEvent>(100);

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        let mut pb: Option<ProgressBar> = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                AnnotationEvent::Started { total_stories } => {
                    let progress = ProgressBar::new(total_stories as u64);
                    progress.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("█▓░"),
                    );
                    progress.set_message("Annotating...");
                    pb = Some(progress);
                }
                AnnotationEvent::StoryStarted { story, row, chars } => {
                    if let Some(ref progress) = pb {
                        progress.set_message(format!(
                            "Processing story {} (row {}, {} chars)",
                            story, row, chars
                        ));
                    }
                }
                AnnotationEvent::StoryCompleted { .. } => {
                    if let Some(ref progress) = pb {
                        progress.inc(1);
                    }
                }
                AnnotationEvent::StorySkipped { story, chars, .. } => {
                    if let Some(ref progress) = pb {
                        progress.println(format!(
                            "{} Skipping story {}: too long ({} chars)",
                            style("!").yellow(),
                            story,
                            chars
                        ));
                        progress.inc(1);
                    }
                }
                AnnotationEvent::StoryFailed { story, error, .. } => {
                    if let Some(ref progress) = pb {
                        progress.println(format!(
                            "{} Error on story {}: {}",
                            style("✗").red(),
                            story,
                            error
                        ));
                        progress.inc(1);
                    }
                }
                AnnotationEvent::Complete { .. } => {
                    if let Some(progress) = pb.take() {
                        progress.finish_and_clear();
                    }
                }
            }
        }
    });

    let result = service.run(&stories, sink.as_mut(), event_tx).await;
    let _ = event_handler.await;
    let summary = result?;

    println!(
        "{} Finished: {} annotated, {} failed, {} skipped (over {} chars)",
        style("✓").green(),
        summary.succeeded,
        summary.failed,
        summary.skipped,
        config.pipeline.char_limit
    );
    if summary.malformed > 0 {
        println!(
            "{} {} responses did not parse as four-phase JSON (saved anyway)",
            style("!").yellow(),
            summary.malformed
        );
    }
    println!(
        "  {} entries in {}",
        sink.len(),
        output_path.display()
    );

    Ok(())
}
