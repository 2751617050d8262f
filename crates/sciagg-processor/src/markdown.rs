//! Markdown files with YAML-ish front matter, one per processed article.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use sciagg_common::Article;
use tracing::debug;

use crate::error::Result;

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap())
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").unwrap())
}

/// First 50 chars of `title` as a lowercase, dash-separated file stem.
pub fn safe_filename(title: &str) -> String {
    let head: String = title.chars().take(50).collect();
    let stripped = non_word_regex().replace_all(&head, "");
    let dashed = separator_regex().replace_all(stripped.trim(), "-");
    let stem = dashed.trim_matches('-').to_lowercase();
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}

/// `{date}_{safe-title}.md`
pub fn post_filename(date: NaiveDate, title: &str) -> String {
    format!("{}_{}.md", date.format("%Y-%m-%d"), safe_filename(title))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn list(values: &[String], max: usize) -> String {
    let items: Vec<String> = values.iter().take(max).map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Full file body: front matter, the post, and optionally the summary and
/// original abstract.
pub fn render_file(
    article: &Article,
    post: &str,
    summary: &str,
    include_metadata: bool,
    generated_at: DateTime<Utc>,
) -> String {
    let date = article
        .publication_date
        .unwrap_or_else(|| generated_at.date_naive());
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("title: {}\n", quote(&article.title)));
    out.push_str(&format!("date: {}\n", date.format("%Y-%m-%d")));
    out.push_str(&format!("source: {}\n", article.source.as_str()));
    out.push_str(&format!("id: {}\n", quote(&article.id)));
    out.push_str(&format!("url: {}\n", article.url));
    out.push_str(&format!("authors: {}\n", list(&article.authors, 3)));
    out.push_str(&format!("topics: {}\n", list(&article.topics, 5)));
    if let Some(doi) = &article.doi {
        out.push_str(&format!("doi: {doi}\n"));
    }
    out.push_str("---\n\n");
    out.push_str(post.trim_end());
    out.push('\n');

    if include_metadata {
        out.push_str("\n## Metadata\n\n");
        out.push_str(&format!("**Generated**: {}\n\n", generated_at.format("%Y-%m-%d %H:%M UTC")));
        out.push_str("### Summary\n\n");
        out.push_str(summary.trim());
        out.push_str("\n\n### Original abstract\n\n");
        out.push_str(article.abstract_text.trim());
        out.push('\n');
    }
    out
}

fn owned_by(path: &Path, article_id: &str) -> bool {
    let Ok(body) = std::fs::read_to_string(path) else {
        return false;
    };
    let expected = format!("id: {}", quote(article_id));
    body.lines()
        .skip(1)
        .take_while(|line| *line != "---")
        .any(|line| line == expected)
}

/// Path for the article's post under `dir`. Titles can collide, so a file
/// written for a different article pushes this one to `-2`, `-3`, ...
pub fn post_path(dir: &Path, date: NaiveDate, article: &Article) -> PathBuf {
    let first = dir.join(post_filename(date, &article.title));
    if !first.exists() || owned_by(&first, &article.id) {
        return first;
    }
    let stem = format!("{}_{}", date.format("%Y-%m-%d"), safe_filename(&article.title));
    let mut n = 2;
    loop {
        let path = dir.join(format!("{stem}-{n}.md"));
        if !path.exists() || owned_by(&path, &article.id) {
            return path;
        }
        n += 1;
    }
}

/// Write the post under `dir`, creating it if needed. Returns the file path.
pub fn write_post(
    dir: &Path,
    article: &Article,
    post: &str,
    summary: &str,
    include_metadata: bool,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = post_path(dir, generated_at.date_naive(), article);
    let body = render_file(article, post, summary, include_metadata, generated_at);
    std::fs::write(&path, body)?;
    debug!(path = %path.display(), "Wrote post");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sciagg_common::Source;

    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("Deep  Learning: for (Plants)!"), "deep-learning-for-plants");
        assert_eq!(safe_filename("  --- "), "untitled");
        let long = "a".repeat(80);
        assert_eq!(safe_filename(&long).len(), 50);
    }

    #[test]
    fn test_post_filename() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(post_filename(d, "Roots & Fungi"), "2024-03-09_roots-fungi.md");
    }

    #[test]
    fn test_render_front_matter() {
        let mut a = Article::new(Source::Crossref, "10.1/x", "A \"quoted\" title");
        a.url = "https://doi.org/10.1/x".into();
        a.doi = Some("10.1/x".into());
        a.authors = vec!["A One".into(), "B Two".into(), "C Three".into(), "D Four".into()];
        a.abstract_text = "Original text.".into();
        a.publication_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        let at = Utc.with_ymd_and_hms(2024, 2, 3, 8, 0, 0).unwrap();

        let body = render_file(&a, "# Post\n", "Short summary.", true, at);
        assert!(body.starts_with("---\ntitle: \"A \\\"quoted\\\" title\"\ndate: 2024-02-01\nsource: crossref\nid: \"crossref:10.1/x\"\n"));
        assert!(body.contains("authors: [\"A One\", \"B Two\", \"C Three\"]\n"));
        assert!(body.contains("topics: []\n"));
        assert!(body.contains("doi: 10.1/x\n---\n\n# Post\n"));
        assert!(body.contains("### Summary\n\nShort summary."));
        assert!(body.contains("### Original abstract\n\nOriginal text."));

        let bare = render_file(&a, "# Post", "Short summary.", false, at);
        assert!(!bare.contains("## Metadata"));
    }

    #[test]
    fn test_write_post_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("posts");
        let a = Article::new(Source::Arxiv, "1", "Tiny paper");
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
        let path = write_post(&dir, &a, "# Tiny", "s", false, at).unwrap();
        assert_eq!(path.file_name().unwrap(), "2024-05-06_tiny-paper.md");
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("# Tiny"));
    }

    #[test]
    fn test_same_title_gets_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
        let genomics = Article::new(
            Source::Arxiv,
            "2405.00001v1",
            "A comprehensive survey of machine learning methods for genomics",
        );
        let ecology = Article::new(
            Source::Crossref,
            "10.1/eco",
            "A comprehensive survey of machine learning methods for ecology",
        );

        let first = write_post(tmp.path(), &genomics, "# Genomics", "s", false, at).unwrap();
        let second = write_post(tmp.path(), &ecology, "# Ecology", "s", false, at).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-methods-2.md"));
        assert!(std::fs::read_to_string(&first).unwrap().contains("# Genomics"));
        assert!(std::fs::read_to_string(&second).unwrap().contains("# Ecology"));

        // Rewriting an article reuses its own file.
        let again = write_post(tmp.path(), &ecology, "# Ecology v2", "s", false, at).unwrap();
        assert_eq!(again, second);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }
}
