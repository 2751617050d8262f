//! Bulk export of stored articles.

use std::fmt;
use std::str::FromStr;

use sciagg_common::Article;
use serde::Serialize;

use crate::error::{ProcessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json     => "json",
            ExportFormat::Csv      => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Json     => "application/json",
            ExportFormat::Csv      => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json     => "json",
            ExportFormat::Csv      => "csv",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json"            => Ok(ExportFormat::Json),
            "csv"             => Ok(ExportFormat::Csv),
            other             => Err(ProcessError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    title: &'a str,
    authors: String,
    source: &'a str,
    date: String,
    url: &'a str,
    doi: &'a str,
    topics: String,
    summary: &'a str,
}

impl<'a> From<&'a Article> for CsvRow<'a> {
    fn from(a: &'a Article) -> Self {
        Self {
            id: &a.id,
            title: &a.title,
            authors: a.authors.join("; "),
            source: a.source.as_str(),
            date: a.publication_date.map(|d| d.to_string()).unwrap_or_default(),
            url: &a.url,
            doi: a.doi.as_deref().unwrap_or(""),
            topics: a.topics.join("; "),
            summary: a.summary.as_deref().unwrap_or(""),
        }
    }
}

pub fn export_articles(articles: &[Article], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(articles)?),
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for article in articles {
                writer.serialize(CsvRow::from(article))?;
            }
            let bytes = writer.into_inner().map_err(|e| ProcessError::Io(e.into_error()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        ExportFormat::Markdown => Ok(export_markdown(articles)),
    }
}

fn export_markdown(articles: &[Article]) -> String {
    let mut sections = vec![format!("# Article export ({} articles)", articles.len())];
    for article in articles {
        let mut lines = vec![format!("## {}", article.title)];
        lines.push(String::new());
        lines.push(format!("- **Source**: {}", article.source.display_name()));
        if !article.authors.is_empty() {
            lines.push(format!("- **Authors**: {}", article.authors.join(", ")));
        }
        if let Some(date) = article.publication_date {
            lines.push(format!("- **Date**: {date}"));
        }
        if !article.url.is_empty() {
            lines.push(format!("- **Link**: {}", article.url));
        }
        if let Some(doi) = &article.doi {
            lines.push(format!("- **DOI**: {doi}"));
        }
        if !article.topics.is_empty() {
            lines.push(format!("- **Topics**: {}", article.topics.join(", ")));
        }
        lines.push(String::new());
        match article.post_content.as_deref().or(article.summary.as_deref()) {
            Some(body) if !body.trim().is_empty() => lines.push(body.trim().to_string()),
            _ => lines.push(article.abstract_text.clone()),
        }
        sections.push(lines.join("\n"));
    }
    sections.join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sciagg_common::Source;

    use super::*;

    fn sample() -> Vec<Article> {
        let mut a = Article::new(Source::Crossref, "10.1/x", "Roots, fungi and \"rain\"");
        a.authors = vec!["Ana Ruiz".into(), "Li Wei".into()];
        a.url = "https://doi.org/10.1/x".into();
        a.doi = Some("10.1/x".into());
        a.topics = vec!["soil".into()];
        a.summary = Some("Fungi help.".into());
        a.publication_date = NaiveDate::from_ymd_opt(2024, 1, 2);
        let b = Article::new(Source::Arxiv, "2401.1", "Second");
        vec![a, b]
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("csv".parse::<ExportFormat>().unwrap().extension(), "csv");
        assert!(matches!("pdf".parse::<ExportFormat>(), Err(ProcessError::UnknownFormat(_))));
    }

    #[test]
    fn test_csv_export() {
        let out = export_articles(&sample(), ExportFormat::Csv).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("id,title,authors,source,date,url,doi,topics,summary"));
        assert_eq!(
            lines.next(),
            Some("crossref:10.1/x,\"Roots, fungi and \"\"rain\"\"\",Ana Ruiz; Li Wei,crossref,2024-01-02,https://doi.org/10.1/x,10.1/x,soil,Fungi help.")
        );
        assert_eq!(lines.next(), Some("arxiv:2401.1,Second,,arxiv,,,,,"));
    }

    #[test]
    fn test_json_export() {
        let out = export_articles(&sample(), ExportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "crossref:10.1/x");
        assert_eq!(items[0]["source"], "crossref");
        assert_eq!(items[0]["authors"][1], "Li Wei");
        assert_eq!(items[1]["doi"], serde_json::Value::Null);
    }

    #[test]
    fn test_markdown_export() {
        let out = export_articles(&sample(), ExportFormat::Markdown).unwrap();
        assert!(out.starts_with("# Article export (2 articles)"));
        assert!(out.contains("## Roots, fungi and \"rain\"\n\n- **Source**: Crossref"));
        assert!(out.contains("Fungi help."));
        assert_eq!(out.matches("\n\n---\n\n").count(), 2);
    }
}
