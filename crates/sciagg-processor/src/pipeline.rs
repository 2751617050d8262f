//! Process run: generate summary and post for every unprocessed article,
//! write the markdown file, persist both with the post record.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use sciagg_common::config::Settings;
use sciagg_common::{Article, Post};
use sciagg_db::ArticleRepository;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::extract::extract_info;
use crate::markdown::write_post;
use crate::post::PostGenerator;
use crate::summarizer::{Summarizer, SummaryStyle};

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub max_summary_length: usize,
    pub max_post_length: usize,
    pub summary_style: SummaryStyle,
    pub markdown_dir: PathBuf,
    pub include_metadata: bool,
}

impl ProcessingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_summary_length: settings.text_processing.max_summary_length,
            max_post_length: settings.text_processing.max_post_length,
            summary_style: SummaryStyle::parse(&settings.text_processing.summary_style),
            markdown_dir: PathBuf::from(&settings.output.markdown_dir),
            include_metadata: settings.output.include_metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub job_id: Uuid,
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub files: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Generated text for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedArticle {
    pub summary: String,
    pub post: String,
}

/// Pure generation step. Same article and settings always give the same text.
pub fn process_article(
    article: &Article,
    summarizer: &Summarizer,
    generator: &PostGenerator,
) -> ProcessedArticle {
    let info = extract_info(&article.abstract_text);
    let summary = summarizer.summarize_extracted(&article.abstract_text, &info);
    let post = generator.generate_with(article, &summary, &info);
    ProcessedArticle { summary, post }
}

/// Process up to `limit` articles lacking a summary or post.
///
/// A file write failure skips that article and is reported in
/// `ProcessingResult.errors`; a storage failure aborts the run.
#[instrument(skip(repo, config))]
pub async fn run_processing(
    repo: &ArticleRepository,
    config: &ProcessingConfig,
    limit: usize,
) -> Result<ProcessingResult> {
    let start = Instant::now();
    let job_id = Uuid::new_v4();
    let summarizer = Summarizer::new(config.max_summary_length, config.summary_style);
    let generator = PostGenerator::new(config.max_post_length);

    let articles = repo.list_unprocessed(limit).await?;
    info!(%job_id, count = articles.len(), "Processing articles");

    let mut result = ProcessingResult {
        job_id,
        selected: articles.len(),
        processed: 0,
        failed: 0,
        errors: Vec::new(),
        files: Vec::new(),
        duration_ms: 0,
    };

    for article in &articles {
        let generated = process_article(article, &summarizer, &generator);
        let generated_at = Utc::now();

        let path = match write_post(
            &config.markdown_dir,
            article,
            &generated.post,
            &generated.summary,
            config.include_metadata,
            generated_at,
        ) {
            Ok(path) => path,
            Err(e) => {
                warn!(id = %article.id, error = %e, "Could not write markdown file");
                result.failed += 1;
                result.errors.push(format!("{}: {e}", article.id));
                continue;
            }
        };

        let post = Post {
            article_id: article.id.clone(),
            markdown_path: path.display().to_string(),
            generated_at,
        };
        if let Err(e) = repo
            .save_processed(&article.id, &generated.summary, &generated.post, Some(&post))
            .await
        {
            error!(id = %article.id, error = %e, "Storing processed article failed, aborting run");
            return Err(e.into());
        }
        result.files.push(path);
        result.processed += 1;
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        %job_id,
        processed = result.processed,
        failed = result.failed,
        duration_ms = result.duration_ms,
        "Processing complete"
    );
    Ok(result)
}
