//! Sentence splitting and narrative-onset detection.
//!
//! The splitter is purely punctuation based: a sentence ends after `.`, `!`
//! or `?` when one or more spaces follow. Abbreviations, quotations, and
//! ellipses are split like any other terminator.

/// Minimum word count for a sentence to count as prose.
pub const MIN_NARRATIVE_WORDS: usize = 8;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` after every terminator followed by one or more spaces.
///
/// The terminator stays with the preceding sentence and the spaces are
/// dropped. Text without a split point yields a single element, so empty
/// input yields `[""]`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) || chars.peek().map(|&(_, n)| n) != Some(' ') {
            continue;
        }
        let end = i + c.len_utf8();
        sentences.push(&text[start..end]);
        start = end;
        while let Some(&(j, ' ')) = chars.peek() {
            start = j + 1;
            chars.next();
        }
    }

    sentences.push(&text[start..]);
    sentences
}

/// Word separator: Unicode whitespace or an ASCII information separator.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Whether a sentence looks like the first line of real prose.
pub fn is_narrative_sentence(sentence: &str) -> bool {
    sentence.split(is_space).filter(|w| !w.is_empty()).count() >= MIN_NARRATIVE_WORDS
        && sentence.chars().last().is_some_and(is_terminator)
}

/// Index of the first narrative sentence, or 0 when none qualifies.
pub fn narrative_start(sentences: &[&str]) -> usize {
    sentences
        .iter()
        .position(|s| is_narrative_sentence(s))
        .unwrap_or(0)
}

/// Drop everything before the first narrative sentence.
pub fn trim_to_narrative(text: &str) -> String {
    let sentences = split_sentences(text);
    let start = narrative_start(&sentences);
    sentences[start..].join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_terminators() {
        assert_eq!(
            split_sentences("One. Two! Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
    }

    #[test]
    fn test_split_requires_space() {
        assert_eq!(split_sentences("e.g.this and.that"), vec!["e.g.this and.that"]);
        assert_eq!(split_sentences("Mr. Smith"), vec!["Mr.", "Smith"]);
    }

    #[test]
    fn test_split_consumes_space_runs() {
        assert_eq!(split_sentences("A.   B."), vec!["A.", "B."]);
    }

    #[test]
    fn test_split_trailing_terminator_and_space() {
        assert_eq!(split_sentences("End. "), vec!["End.", ""]);
    }

    #[test]
    fn test_split_repeated_terminators() {
        assert_eq!(split_sentences("Wait... what?! No"), vec!["Wait...", "what?!", "No"]);
        assert_eq!(split_sentences("a. . b"), vec!["a.", ".", "b"]);
    }

    #[test]
    fn test_split_empty() {
        assert_eq!(split_sentences(""), vec![""]);
    }

    #[test]
    fn test_split_non_ascii() {
        assert_eq!(
            split_sentences("“Oh, there IS one.” Café? Naïve."),
            vec!["“Oh, there IS one.” Café?", "Naïve."]
        );
    }

    #[test]
    fn test_narrative_sentence_word_count() {
        assert!(is_narrative_sentence("one two three four five six seven eight."));
        assert!(!is_narrative_sentence("one two three four five six seven."));
    }

    #[test]
    fn test_narrative_sentence_needs_terminator() {
        assert!(!is_narrative_sentence("one two three four five six seven eight"));
        assert!(is_narrative_sentence("one two three four five six seven eight!"));
        assert!(!is_narrative_sentence(""));
    }

    #[test]
    fn test_narrative_sentence_counts_separator_split_words() {
        assert!(is_narrative_sentence(
            "one\u{1c}two\u{1d}three\u{1e}four\u{1f}five six seven eight."
        ));
    }

    #[test]
    fn test_narrative_start_defaults_to_zero() {
        assert_eq!(narrative_start(&["Short.", "Also short."]), 0);
        assert_eq!(narrative_start(&[""]), 0);
    }

    #[test]
    fn test_trim_to_narrative() {
        let text = "CHAPTER I. THE GHOST. It was the first time the house had been empty in years.";
        assert_eq!(
            trim_to_narrative(text),
            "It was the first time the house had been empty in years."
        );
    }
}
