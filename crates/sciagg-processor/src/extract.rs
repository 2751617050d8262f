//! Regex heuristics that pull the parts of a study out of its abstract.

use std::sync::OnceLock;

use regex::Regex;
use sciagg_common::text::{capitalize, collapse_whitespace, split_sentences};

use crate::jargon::simplify_jargon;

/// Structured view of an abstract. Every field is already jargon-simplified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedInfo {
    pub problem: Option<String>,
    pub methodology: Option<String>,
    pub results: Option<String>,
    pub conclusions: Option<String>,
    pub data_info: Option<String>,
    pub key_numbers: Vec<String>,
}

impl ExtractedInfo {
    pub fn is_empty(&self) -> bool {
        self.problem.is_none()
            && self.methodology.is_none()
            && self.results.is_none()
            && self.conclusions.is_none()
            && self.data_info.is_none()
            && self.key_numbers.is_empty()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

fn problem_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(&[
            r"(?i)\b(?:aim|aimed|goal|objective|purpose|problem|challenge|issue)s?\s+(?:is|was|were|to|of)\s+([^.]{20,150})",
            r"(?i)\b(?:study|research|work|paper)\s+(?:aims|addresses|tackles|solves|investigates)\s+([^.]{20,150})",
            r"(?i)\b(?:main|primary|key)\s+(?:goal|objective|aim|purpose)\s+(?:is|was)\s+([^.]{20,150})",
            r"(?i)\bwe\s+(?:propose|present|develop|introduce)\s+([^.]{20,150})",
        ])
    })
}

fn methodology_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(&[
            r"(?i)\b(?:used|employed|applied|implemented|developed|created)\s+([^.]{20,200})",
            r"(?i)\b(?:method|approach|algorithm|technique|procedure)\s+(?:involves|consists|includes)\s+([^.]{20,200})",
            r"(?i)\bour\s+(?:methodology|approach|method)\s+(?:is|was|consists)\s+([^.]{20,200})",
            r"(?i)\b(?:analyzed|analysed|processed|examined|evaluated)\s+([^.]{20,200})",
        ])
    })
}

fn results_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(&[
            r"(?i)\b(?:found|discovered|observed|showed|demonstrated|achieved)\s+([^.]{20,200})",
            r"(?i)\b(?:results|findings|outcomes)\s+(?:show|indicate|reveal|suggest)\s+([^.]{20,200})",
            r"(?i)\b(?:analysis|experiments|evaluation)\s+(?:revealed|showed|indicated)\s+([^.]{20,200})",
            r"(?i)\b(?:performance|accuracy|improvement)\s+(?:of|was|reached)\s+([^.]{20,100})",
        ])
    })
}

fn conclusion_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(&[
            r"(?i)\bwe\s+(?:conclude|concluded)\s+(?:that\s+)?([^.]{20,200})",
            r"(?i)\bin\s+(?:conclusion|summary),?\s+([^.]{20,200})",
            r"(?i)\b(?:study|research|work)\s+(?:demonstrates|shows|proves)\s+([^.]{20,200})",
            r"(?i)\b(?:findings|results)\s+(?:suggest|indicate|imply)\s+([^.]{20,200})",
        ])
    })
}

fn data_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(&[
            r"(?i)\b(?:used|analyzed|analysed|collected)\s+([^.]*(?:dataset|data|samples|participants)[^.]{0,100})",
            r"(?i)\b(?:dataset|data)\s+(?:contains|includes|consists)\s+([^.]{20,150})",
            r"(?i)\b(?:a\s+total\s+of|we\s+collected)\s+([^.]*(?:samples|participants|data points)[^.]{0,100})",
        ])
    })
}

fn percentage_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?%").unwrap())
}

fn metric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b((?:accuracy|precision|recall|f1|auc)(?:\s+of)?\s+\d+(?:\.\d+)?%?)").unwrap()
    })
}

fn change_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b((?:improvement|increase|reduction)(?:\s+of)?\s+\d+(?:\.\d+)?%?)").unwrap()
    })
}

/// Jargon substitution, whitespace cleanup, leading capital.
fn clean_fragment(text: &str) -> String {
    capitalize(&collapse_whitespace(&simplify_jargon(text.trim())))
}

/// Captures of every pattern, in pattern order, cleaned and longer than 15 chars.
fn collect(patterns: &[Regex], text: &str, max: usize) -> Option<String> {
    let mut details: Vec<String> = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(text) {
            let detail = clean_fragment(&caps[1]);
            if detail.len() > 15 && !details.contains(&detail) {
                details.push(detail);
            }
        }
    }
    details.truncate(max);
    (!details.is_empty()).then(|| details.join(". "))
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text).map(|caps| clean_fragment(&caps[1])))
        .filter(|s| !s.is_empty())
}

fn extract_problem(text: &str) -> Option<String> {
    first_match(problem_patterns(), text).or_else(|| {
        split_sentences(text)
            .into_iter()
            .take(3)
            .find(|s| {
                let lower = s.to_lowercase();
                ["problem", "challenge", "aim", "goal", "objective"]
                    .iter()
                    .any(|w| lower.contains(w))
            })
            .map(|s| clean_fragment(s.trim_end_matches(['.', '!', '?'])))
    })
}

fn extract_key_numbers(text: &str) -> Vec<String> {
    let mut numbers: Vec<String> = Vec::new();
    let mut push = |value: &str| {
        let value = value.trim().to_string();
        if !numbers.contains(&value) {
            numbers.push(value);
        }
    };
    for m in percentage_regex().find_iter(text).take(3) {
        push(m.as_str());
    }
    for caps in metric_regex().captures_iter(text).take(2) {
        push(&caps[1]);
    }
    for caps in change_regex().captures_iter(text).take(2) {
        push(&caps[1]);
    }
    numbers.truncate(5);
    numbers
}

/// Run every heuristic over `abstract_text`.
pub fn extract_info(abstract_text: &str) -> ExtractedInfo {
    let text = collapse_whitespace(abstract_text);
    if text.is_empty() {
        return ExtractedInfo::default();
    }
    ExtractedInfo {
        problem: extract_problem(&text),
        methodology: collect(methodology_patterns(), &text, 3),
        results: collect(results_patterns(), &text, 3),
        conclusions: collect(conclusion_patterns(), &text, 2),
        data_info: first_match(data_patterns(), &text),
        key_numbers: extract_key_numbers(&text),
    }
}
