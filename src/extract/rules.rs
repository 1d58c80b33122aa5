//! Ordered text-transform rules applied before narrative-onset detection.
//!
//! Each rule is named and carries its rationale so it can be listed,
//! logged, and tested on its own. Rules run in the order of [`RULES`];
//! every rule sees the output of the one before it.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Project Gutenberg legal header, from the START marker through the next `***`.
static GUTENBERG_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*\* START OF (THIS|THE) PROJECT GUTENBERG EBOOK.*?\*\*\*").unwrap()
});

/// Project Gutenberg legal footer, from the END marker through end of text.
static GUTENBERG_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)End of (the|this) Project Gutenberg.*").unwrap());

static PRODUCED_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Produced by").unwrap());

/// Case-insensitive `[A-Z]`, so lowercase letters also end a production credit.
static CREDIT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[A-Z]").unwrap());

static TRANSCRIBER_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[.*?Transcriber.*?\]").unwrap());

/// A URL runs until whitespace or an information separator.
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http[^\s\x1C-\x1F]+").unwrap());

static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Unicode whitespace plus the ASCII information separators (U+001C..U+001F).
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x1C-\x1F]+").unwrap());

/// How many matches of a regex rule are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    First,
    All,
}

/// The operation a rule performs.
#[derive(Clone, Copy)]
pub enum Transform {
    /// Replace matches of a pattern. The pattern is compiled on first use.
    Regex {
        pattern: fn() -> &'static Regex,
        replacement: &'static str,
        scope: Scope,
    },
    /// Replace every occurrence of a literal substring.
    Literal {
        from: &'static str,
        to: &'static str,
    },
    /// Arbitrary transform for behavior a plain pattern cannot express.
    Custom(fn(&str) -> Cow<'_, str>),
}

/// Which phase of cleaning a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Boilerplate,
    Annotation,
    Whitespace,
}

/// A named text-transform rule.
#[derive(Clone, Copy)]
pub struct TextRule {
    pub name: &'static str,
    pub stage: Stage,
    pub rationale: &'static str,
    pub transform: Transform,
}

impl TextRule {
    /// Apply this rule to `text`, borrowing when nothing changes.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self.transform {
            Transform::Regex {
                pattern,
                replacement,
                scope: Scope::First,
            } => pattern().replacen(text, 1, replacement),
            Transform::Regex {
                pattern,
                replacement,
                scope: Scope::All,
            } => pattern().replace_all(text, replacement),
            Transform::Literal { from, to } => {
                if text.contains(from) {
                    Cow::Owned(text.replace(from, to))
                } else {
                    Cow::Borrowed(text)
                }
            }
            Transform::Custom(f) => f(text),
        }
    }
}

impl std::fmt::Debug for TextRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRule")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .finish()
    }
}

/// Remove every `Produced by` credit up to (not including) the next letter.
///
/// A credit with no letter after it is left alone.
fn strip_production_credits(text: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut rest = text;
    let mut changed = false;

    while let Some(m) = PRODUCED_BY.find(rest) {
        let after = &rest[m.end()..];
        let Some(letter) = CREDIT_END.find(after) else {
            break;
        };
        out.push_str(&rest[..m.start()]);
        rest = &after[letter.start()..];
        changed = true;
    }

    if !changed {
        return Cow::Borrowed(text);
    }
    out.push_str(rest);
    Cow::Owned(out)
}

pub const GUTENBERG_HEADER_RULE: TextRule = TextRule {
    name: "gutenberg_header",
    stage: Stage::Boilerplate,
    rationale: "Legal header preceding the ebook body; only the first block is removed.",
    transform: Transform::Regex {
        pattern: || &*GUTENBERG_HEADER,
        replacement: "",
        scope: Scope::First,
    },
};

pub const GUTENBERG_FOOTER_RULE: TextRule = TextRule {
    name: "gutenberg_footer",
    stage: Stage::Boilerplate,
    rationale: "License footer; everything after the end marker is non-narrative.",
    transform: Transform::Regex {
        pattern: || &*GUTENBERG_FOOTER,
        replacement: "",
        scope: Scope::All,
    },
};

pub const PRODUCTION_CREDIT_RULE: TextRule = TextRule {
    name: "production_credit",
    stage: Stage::Annotation,
    rationale: "Volunteer production credits placed ahead of the title page.",
    transform: Transform::Custom(strip_production_credits),
};

pub const TRANSCRIBER_NOTE_RULE: TextRule = TextRule {
    name: "transcriber_note",
    stage: Stage::Annotation,
    rationale: "Bracketed transcriber notes inserted into the text.",
    transform: Transform::Regex {
        pattern: || &*TRANSCRIBER_NOTE,
        replacement: "",
        scope: Scope::All,
    },
};

pub const URL_RULE: TextRule = TextRule {
    name: "url",
    stage: Stage::Annotation,
    rationale: "Raw URLs never belong to the narrative.",
    transform: Transform::Regex {
        pattern: || &*URL,
        replacement: "",
        scope: Scope::All,
    },
};

pub const NEWLINE_RUNS_RULE: TextRule = TextRule {
    name: "newline_runs",
    stage: Stage::Whitespace,
    rationale: "Collapse large vertical gaps to a single section break.",
    transform: Transform::Regex {
        pattern: || &*NEWLINE_RUNS,
        replacement: "\n\n\n",
        scope: Scope::All,
    },
};

pub const ESCAPED_NEWLINE_RULE: TextRule = TextRule {
    name: "escaped_newline",
    stage: Stage::Whitespace,
    rationale: "Datasets exported with literal backslash-n sequences.",
    transform: Transform::Literal {
        from: "\\n",
        to: " ",
    },
};

pub const WHITESPACE_RUNS_RULE: TextRule = TextRule {
    name: "whitespace_runs",
    stage: Stage::Whitespace,
    rationale: "Sentence detection expects single spaces between tokens.",
    transform: Transform::Regex {
        pattern: || &*WHITESPACE_RUNS,
        replacement: " ",
        scope: Scope::All,
    },
};

/// All cleaning rules, in application order.
pub const RULES: &[TextRule] = &[
    GUTENBERG_HEADER_RULE,
    GUTENBERG_FOOTER_RULE,
    PRODUCTION_CREDIT_RULE,
    TRANSCRIBER_NOTE_RULE,
    URL_RULE,
    NEWLINE_RUNS_RULE,
    ESCAPED_NEWLINE_RULE,
    WHITESPACE_RUNS_RULE,
];

/// Apply `rules` in order.
pub fn apply_rules(text: &str, rules: &[TextRule]) -> String {
    let mut current = Cow::Borrowed(text);
    for rule in rules {
        let next = match rule.apply(&current) {
            Cow::Owned(next) => next,
            Cow::Borrowed(_) => continue,
        };
        current = Cow::Owned(next);
    }
    current.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "*** START OF THE PROJECT GUTENBERG EBOOK THE GHOST ***";

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "gutenberg_header",
                "gutenberg_footer",
                "production_credit",
                "transcriber_note",
                "url",
                "newline_runs",
                "escaped_newline",
                "whitespace_runs",
            ]
        );
    }

    #[test]
    fn test_header_absent() {
        let text = "Once upon a time.";
        assert!(matches!(GUTENBERG_HEADER_RULE.apply(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_header_at_start() {
        let text = format!("{HEADER}\n\nIt was a dark night.");
        assert_eq!(GUTENBERG_HEADER_RULE.apply(&text), "\n\nIt was a dark night.");
    }

    #[test]
    fn test_header_case_insensitive_and_multiline() {
        let text = "Title\n*** start of this project gutenberg ebook\nTHE\nGHOST ***Body";
        assert_eq!(GUTENBERG_HEADER_RULE.apply(text), "Title\nBody");
    }

    #[test]
    fn test_header_only_first_removed() {
        let text = format!("{HEADER}one {HEADER}two");
        assert_eq!(GUTENBERG_HEADER_RULE.apply(&text), format!("one {HEADER}two"));
    }

    #[test]
    fn test_header_requires_closing_marker() {
        let text = "*** START OF THE PROJECT GUTENBERG EBOOK and nothing else";
        assert_eq!(GUTENBERG_HEADER_RULE.apply(text), text);
    }

    #[test]
    fn test_footer_removes_to_end() {
        let text = "The end of the tale.\nEnd of the Project Gutenberg EBook\nLicense\nmore";
        assert_eq!(GUTENBERG_FOOTER_RULE.apply(text), "The end of the tale.\n");
    }

    #[test]
    fn test_footer_at_start_removes_everything() {
        let text = "END OF THIS PROJECT GUTENBERG EBOOK";
        assert_eq!(GUTENBERG_FOOTER_RULE.apply(text), "");
    }

    #[test]
    fn test_footer_absent() {
        let text = "The end of the tale.";
        assert_eq!(GUTENBERG_FOOTER_RULE.apply(text), text);
    }

    #[test]
    fn test_production_credit_stops_at_next_letter() {
        let text = "Produced by Jane Doe SOME TITLE";
        assert_eq!(PRODUCTION_CREDIT_RULE.apply(text), "Jane Doe SOME TITLE");
    }

    #[test]
    fn test_production_credit_skips_punctuation_and_digits() {
        let text = "Produced by: 1999, -- (c) Title";
        assert_eq!(PRODUCTION_CREDIT_RULE.apply(text), "c) Title");
    }

    #[test]
    fn test_production_credit_lowercase_letter_ends_removal() {
        let text = "produced by\n\n  the team";
        assert_eq!(PRODUCTION_CREDIT_RULE.apply(text), "the team");
    }

    #[test]
    fn test_production_credit_without_following_letter() {
        let text = "Title. Produced by 123 ...";
        assert!(matches!(PRODUCTION_CREDIT_RULE.apply(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_production_credit_repeated() {
        let text = "Produced by Produced by Amy. Then Produced by  Bob";
        assert_eq!(PRODUCTION_CREDIT_RULE.apply(text), "Amy. Then Bob");
    }

    #[test]
    fn test_transcriber_note_removed() {
        let text = "Before [Transcriber's Note: typos fixed] after [note by the transcriber]!";
        assert_eq!(TRANSCRIBER_NOTE_RULE.apply(text), "Before  after !");
    }

    #[test]
    fn test_transcriber_note_spans_lines() {
        let text = "A [Illustration\nTranscriber\nnote] B";
        assert_eq!(TRANSCRIBER_NOTE_RULE.apply(text), "A  B");
    }

    #[test]
    fn test_plain_brackets_kept() {
        let text = "A [Illustration: a dog] B";
        assert_eq!(TRANSCRIBER_NOTE_RULE.apply(text), text);
    }

    #[test]
    fn test_url_removed() {
        assert_eq!(URL_RULE.apply("Visit http://example.com/page now."), "Visit  now.");
        assert_eq!(URL_RULE.apply("https://a.b/c"), "");
        assert_eq!(URL_RULE.apply("a http b"), "a http b");
        assert_eq!(URL_RULE.apply("see http://a.b\u{1c}next"), "see \u{1c}next");
    }

    #[test]
    fn test_newline_runs() {
        assert_eq!(NEWLINE_RUNS_RULE.apply("a\n\n\nb"), "a\n\n\nb");
        assert_eq!(NEWLINE_RUNS_RULE.apply("a\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(NEWLINE_RUNS_RULE.apply("a\n\n\n\nb\n\n\n\n\n\n\nc"), "a\n\n\nb\n\n\nc");
    }

    #[test]
    fn test_escaped_newline() {
        assert_eq!(ESCAPED_NEWLINE_RULE.apply(r"one\ntwo"), "one two");
        assert!(matches!(ESCAPED_NEWLINE_RULE.apply("one\ntwo"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_whitespace_runs() {
        assert_eq!(WHITESPACE_RUNS_RULE.apply("a \t\n b\r\nc"), "a b c");
    }

    #[test]
    fn test_whitespace_runs_include_separators() {
        assert_eq!(
            WHITESPACE_RUNS_RULE.apply("\u{1c} three .\u{1d}two\u{1e}\u{1f} x"),
            " three . two x"
        );
    }

    #[test]
    fn test_apply_rules_full_sequence() {
        let text = format!(
            "{HEADER}\nProduced by J. Smith\n\n\n\n\nSee http://x.y\\nThe [Transcriber] tale.\nEnd of the Project Gutenberg"
        );
        // The URL rule runs before escaped newlines are expanded, so it eats "\nThe".
        assert_eq!(apply_rules(&text, RULES), " J. Smith See tale. ");
    }
}
