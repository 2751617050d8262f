//! Small text helpers used by harvesters, the validator and the processor.

use std::sync::OnceLock;

use regex::Regex;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn space_before_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([.,;:!?)\]])").unwrap())
}

fn space_after_bracket_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([(\[])\s+").unwrap())
}

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Terminal punctuation followed by whitespace; decimals like 0.95 never match.
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap())
}

/// Collapse runs of whitespace (including newlines) into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove HTML/JATS tags and decode the handful of entities APIs actually emit.
pub fn strip_markup(text: &str) -> String {
    let without_tags = tag_regex().replace_all(text, " ");
    let decoded = without_tags
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    // Tags replaced by a space must not leave gaps before punctuation.
    let collapsed = collapse_whitespace(&decoded);
    let tightened = space_before_punct_regex().replace_all(&collapsed, "$1");
    space_after_bracket_regex().replace_all(&tightened, "$1").into_owned()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max_words` words of `text`, re-joined with single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split prose into sentences, keeping the terminating punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = collapse_whitespace(text);
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in sentence_regex().find_iter(&text) {
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Uppercase the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_removes_jats() {
        let raw = "<jats:p>Deep   learning &amp; <jats:italic>genomics</jats:italic>.</jats:p>";
        assert_eq!(strip_markup(raw), "Deep learning & genomics.");
    }

    #[test]
    fn test_strip_markup_keeps_punctuation_attached() {
        let raw = "<p>Yield rose by <b>12%</b>, mostly in <i>maize</i> (<i>Zea mays</i>); \
                   see <sup>1</sup>!</p>";
        assert_eq!(
            strip_markup(raw),
            "Yield rose by 12%, mostly in maize (Zea mays); see 1!"
        );
        // Decimals and words are untouched.
        assert_eq!(strip_markup("<p>AUC of 0.95 . Done</p>"), "AUC of 0.95. Done");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("one two  three\nfour", 3), "one two three");
        assert_eq!(truncate_words("short", 10), "short");
        assert_eq!(word_count(" a b   c "), 3);
    }

    #[test]
    fn test_split_sentences() {
        let s = split_sentences("We propose X. Results show 95% accuracy! Is it good? yes");
        assert_eq!(s, vec!["We propose X.", "Results show 95% accuracy!", "Is it good?", "yes"]);
    }

    #[test]
    fn test_split_sentences_keeps_decimals() {
        let s = split_sentences("Accuracy was 0.95 overall. Done.");
        assert_eq!(s, vec!["Accuracy was 0.95 overall.", "Done."]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("hello world"), "Hello world");
        assert_eq!(capitalize(""), "");
    }
}
