//! Static jargon → plain-language dictionary and statistics rewording.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Applied in order; multi-word terms come before the words they contain.
pub const JARGON: &[(&str, &str)] = &[
    ("statistical significance",  "a result unlikely to be chance"),
    ("confidence interval",       "range of likely values"),
    ("standard deviation",        "typical spread"),
    ("machine learning",          "computers learning from examples"),
    ("deep learning",             "layered computer learning"),
    ("neural network",            "brain-inspired computer model"),
    ("gene expression",           "how active genes are"),
    ("protein folding",           "how proteins take their shape"),
    ("molecular dynamics",        "simulations of moving molecules"),
    ("binding affinity",          "how tightly molecules stick together"),
    ("enzyme kinetics",           "how fast enzymes work"),
    ("metabolic pathway",         "chain of chemical reactions in the cell"),
    ("bioinformatics",            "computer analysis of biological data"),
    ("transcriptomics",           "the study of gene activity"),
    ("proteomics",                "the study of proteins"),
    ("genomics",                  "the study of genes"),
    ("phylogenetic",              "evolutionary"),
    ("phylogeny",                 "evolutionary history"),
    ("orthologous",               "shared across species"),
    ("paralogous",                "duplicated within a species"),
    ("homologous",                "evolutionarily related"),
    ("algorithm",                 "step-by-step method"),
    ("heuristic",                 "rule of thumb"),
    ("optimization",              "fine-tuning"),
    ("clustering",                "grouping"),
    ("classification",            "sorting into categories"),
    ("regression",                "numeric prediction"),
    ("p-value",                   "chance probability"),
    ("correlation",               "link"),
    ("variance",                  "spread"),
    ("methodology",               "approach"),
    ("implementation",            "build"),
    ("validation",                "checking"),
    ("benchmark",                 "comparison test"),
    ("dataset",                   "data collection"),
    ("framework",                 "toolkit"),
];

fn jargon_regexes() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        JARGON
            .iter()
            .map(|(term, plain)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
                (Regex::new(&pattern).unwrap(), *plain)
            })
            .collect()
    })
}

fn p_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(?\bp\s*[<=]\s*0?\.0[0-5]\d*\)?").unwrap())
}

fn long_percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d{3,})%").unwrap())
}

fn tiny_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?\s*[×x]\s*10\^?[-−]\d+").unwrap())
}

/// Replace every dictionary term, case-insensitively and on word boundaries.
pub fn simplify_jargon(text: &str) -> String {
    let mut out = text.to_string();
    for (re, plain) in jargon_regexes() {
        out = re.replace_all(&out, *plain).into_owned();
    }
    simplify_statistics(&out)
}

/// Reword p-values, over-precise percentages and scientific notation.
pub fn simplify_statistics(text: &str) -> String {
    let out = p_value_regex().replace_all(text, "(statistically significant)");
    let out = long_percent_regex().replace_all(&out, |caps: &Captures<'_>| {
        let value: f64 = caps[1].parse().unwrap_or_default();
        format!("{}%", value.round())
    });
    let out = tiny_number_regex().replace_all(&out, "a tiny number");
    out.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_jargon_is_case_insensitive() {
        assert_eq!(
            simplify_jargon("Genomics meets Machine Learning"),
            "the study of genes meets computers learning from examples"
        );
    }

    #[test]
    fn test_word_boundaries() {
        // "datasets" is not "dataset"; the plural stays untouched.
        assert_eq!(simplify_jargon("two datasets"), "two datasets");
        assert_eq!(simplify_jargon("one dataset."), "one data collection.");
    }

    #[test]
    fn test_simplify_statistics() {
        assert_eq!(
            simplify_statistics("gains were large (p < 0.001) at 93.4567% coverage"),
            "gains were large (statistically significant) at 93% coverage"
        );
        assert_eq!(simplify_statistics("rate of 3.2 x 10^-6"), "rate of a tiny number");
        assert_eq!(simplify_statistics("accuracy of 91.5%"), "accuracy of 91.5%");
    }
}
