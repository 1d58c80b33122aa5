//! Narrative extraction from transcribed public-domain texts.
//!
//! [`extract_story`] strips legal boilerplate and transcription notes,
//! normalizes whitespace, and drops front matter (title pages, dedications,
//! tables of contents) by starting at the first long, properly terminated
//! sentence. The heuristic is approximate by nature.

pub mod rules;
pub mod sentences;

pub use rules::{apply_rules, Stage, TextRule, RULES};
pub use sentences::{is_narrative_sentence, narrative_start, split_sentences, MIN_NARRATIVE_WORDS};

/// Apply boilerplate, annotation and whitespace rules, then trim.
pub fn normalize(text: &str) -> String {
    apply_rules(text, RULES).trim().to_string()
}

/// Return the best-effort narrative body of `text`.
///
/// Never fails. If no sentence qualifies as prose the whole normalized text
/// is returned.
pub fn extract_story(text: &str) -> String {
    sentences::trim_to_narrative(&normalize(text))
}
