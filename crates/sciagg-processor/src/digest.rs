//! Daily digest: one markdown page listing the day's articles by source.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use sciagg_common::{Article, Source};
use tracing::info;

use crate::error::Result;

const PER_SOURCE: usize = 3;
const TOP_TOPICS: usize = 5;
const SNIPPET_CHARS: usize = 100;

pub const EMPTY_DIGEST: &str = "No articles were collected today.";

/// Topics by article count, ties broken alphabetically.
pub fn top_topics(articles: &[Article], max: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for article in articles {
        for topic in &article.topics {
            *counts.entry(topic.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> =
        counts.into_iter().map(|(t, c)| (t.to_string(), c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max);
    ranked
}

pub fn build_digest(articles: &[Article], date: NaiveDate, generated_at: DateTime<Utc>) -> String {
    if articles.is_empty() {
        return EMPTY_DIGEST.to_string();
    }

    let mut by_source: BTreeMap<Source, Vec<&Article>> = BTreeMap::new();
    for article in articles {
        by_source.entry(article.source).or_default().push(article);
    }

    let mut lines = vec![
        format!("# Daily Science Digest - {}", date.format("%B %-d, %Y")),
        String::new(),
        format!("Today brought **{} articles** from {} sources.", articles.len(), by_source.len()),
        String::new(),
        "## Articles by source".to_string(),
        String::new(),
    ];

    for (source, items) in &by_source {
        lines.push(format!("### {} ({} articles)", source.display_name(), items.len()));
        lines.push(String::new());
        for article in items.iter().take(PER_SOURCE) {
            lines.push(format!("- **{}**", article.title));
            if let Some(summary) = article.summary.as_deref().filter(|s| !s.is_empty()) {
                let snippet: String = summary.chars().take(SNIPPET_CHARS).collect();
                lines.push(format!("  {snippet}..."));
            }
        }
        lines.push(String::new());
    }

    let topics = top_topics(articles, TOP_TOPICS);
    if !topics.is_empty() {
        lines.push("## Most frequent topics".to_string());
        lines.push(String::new());
        for (topic, count) in topics {
            lines.push(format!("- {topic}: {count} articles"));
        }
        lines.push(String::new());
    }

    let summaries = articles.iter().filter(|a| a.summary.is_some()).count();
    let posts = articles.iter().filter(|a| a.post_content.is_some()).count();
    lines.extend([
        "## Statistics".to_string(),
        String::new(),
        format!("- Articles: {}", articles.len()),
        format!("- Sources: {}", by_source.len()),
        format!("- With summary: {summaries}"),
        format!("- With post: {posts}"),
        String::new(),
        format!("*Generated {}*", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    lines.join("\n")
}

/// Write `{date}_daily-digest.md` under `dir`.
pub fn write_digest(
    dir: &Path,
    date: NaiveDate,
    articles: &[Article],
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_daily-digest.md", date.format("%Y-%m-%d")));
    std::fs::write(&path, build_digest(articles, date, generated_at))?;
    info!(path = %path.display(), articles = articles.len(), "Daily digest written");
    Ok(path)
}
