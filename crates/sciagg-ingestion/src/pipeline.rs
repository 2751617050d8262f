//! Harvest run.
//!
//! Orchestrates one collection pass:
//!   1. Build a client for every configured source (unsupported ones are skipped)
//!   2. Search the sources, in parallel with a bounded worker pool or one by one
//!   3. Deduplicate the merged batch by DOI, then URL
//!   4. Validate and clean each record
//!   5. Insert new rows, skipping ones already stored
//!   6. Emit progress events via broadcast channel
//!
//! Called from the CLI, the scheduler and the dashboard.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sciagg_common::config::Settings;
use sciagg_common::{ApiKeys, Article, Source};
use sciagg_db::ArticleRepository;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::dedup::dedup_articles;
use crate::error::Result;
use crate::sources::{build_source, is_supported, ArticleSource, HarvestQuery};
use crate::validate::DataValidator;

/// Pause between sources in sequential mode.
const SEQUENTIAL_PAUSE: Duration = Duration::from_secs(1);

// ── Job config ───────────────────────────────────────────────────────────────

/// Parameters for a single harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestJob {
    pub topics: Vec<String>,
    pub sources: Vec<Source>,
    pub days_back: u32,
    pub max_per_source: usize,
    pub parallel: bool,
    pub max_workers: usize,
}

impl HarvestJob {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            topics: settings.topics.clone(),
            sources: settings.search.sources.clone(),
            days_back: settings.search.days_back,
            max_per_source: settings.search.max_articles_per_source,
            parallel: settings.search.parallel,
            max_workers: settings.search.max_workers,
        }
    }

    fn query(&self) -> HarvestQuery {
        HarvestQuery::new(self.topics.clone(), self.days_back, self.max_per_source)
    }
}

// ── Progress events ──────────────────────────────────────────────────────────

/// Progress event emitted during a harvest run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct HarvestProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub source: Option<Source>,
    pub articles_found: usize,
    pub error: Option<String>,
}

impl HarvestProgress {
    fn new(job_id: Uuid, stage: &str, message: impl Into<String>) -> Self {
        Self {
            job_id,
            stage: stage.to_string(),
            message: message.into(),
            source: None,
            articles_found: 0,
            error: None,
        }
    }
}

// ── Result summary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HarvestResult {
    pub job_id: Uuid,
    /// Articles returned by the sources before deduplication.
    pub articles_found: usize,
    pub per_source: BTreeMap<Source, usize>,
    pub duplicates_in_batch: usize,
    pub rejected: usize,
    pub inserted: usize,
    /// Already stored under the same `(source, external_id)` or DOI.
    pub already_stored: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl HarvestResult {
    fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            articles_found: 0,
            per_source: BTreeMap::new(),
            duplicates_in_batch: 0,
            rejected: 0,
            inserted: 0,
            already_stored: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Every source errored and none returned results.
    pub fn all_sources_failed(&self) -> bool {
        self.per_source.is_empty() && !self.errors.is_empty()
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Build clients for the job's sources. Sources without a harvester are
/// logged and reported in the returned error list.
pub fn build_sources(job: &HarvestJob, keys: &ApiKeys) -> (Vec<Arc<dyn ArticleSource>>, Vec<String>) {
    let mut clients = Vec::new();
    let mut errors = Vec::new();
    for &source in &job.sources {
        match build_source(source, keys) {
            Ok(client) => clients.push(client),
            Err(e) => {
                warn!(%source, error = %e, "Skipping source");
                errors.push(e.to_string());
            }
        }
    }
    (clients, errors)
}

/// Run one harvest for `job` using the endpoints and credentials in `keys`.
///
/// Source failures are recorded in [`HarvestResult::errors`]; only a storage
/// failure aborts the run.
#[instrument(skip(job, keys, repo, progress_tx), fields(sources = job.sources.len()))]
pub async fn run_harvest(
    job: &HarvestJob,
    keys: &ApiKeys,
    repo: &ArticleRepository,
    progress_tx: Option<broadcast::Sender<HarvestProgress>>,
) -> Result<HarvestResult> {
    let (clients, errors) = build_sources(job, keys);
    let mut result = harvest_with(job, clients, repo, progress_tx).await?;
    result.errors.splice(0..0, errors);
    Ok(result)
}

/// Run one harvest over already-built clients.
pub async fn harvest_with(
    job: &HarvestJob,
    clients: Vec<Arc<dyn ArticleSource>>,
    repo: &ArticleRepository,
    progress_tx: Option<broadcast::Sender<HarvestProgress>>,
) -> Result<HarvestResult> {
    let job_id = Uuid::new_v4();
    let t0 = std::time::Instant::now();
    let mut result = HarvestResult::new(job_id);

    let emit = |progress: HarvestProgress| {
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(progress);
        }
    };

    info!(job_id = %job_id, sources = clients.len(), parallel = job.parallel, "Starting harvest");
    emit(HarvestProgress::new(
        job_id,
        "search",
        format!("Searching {} source(s)", clients.len()),
    ));

    // ── 1. Collect from every source ─────────────────────────────────────────
    let query = job.query();
    let mut outcomes = if job.parallel && clients.len() > 1 {
        search_parallel(clients, &query, job.max_workers).await
    } else {
        search_sequential(clients, &query).await
    };
    // Merge in a stable order regardless of completion order.
    outcomes.sort_by_key(|(source, _)| *source);

    let mut batch: Vec<Article> = Vec::new();
    for (source, outcome) in outcomes {
        let mut progress = HarvestProgress::new(job_id, "search", "");
        progress.source = Some(source);
        match outcome {
            Ok(articles) => {
                info!(%source, n = articles.len(), "Articles retrieved");
                result.per_source.insert(source, articles.len());
                progress.articles_found = articles.len();
                progress.message = format!("{} returned {} article(s)", source.display_name(), articles.len());
                batch.extend(articles);
            }
            Err(e) => {
                let msg = format!("{} error: {e}", source.display_name());
                warn!("{}", &msg);
                progress.message = msg.clone();
                progress.error = Some(e.to_string());
                result.errors.push(msg);
            }
        }
        emit(progress);
    }
    result.articles_found = batch.len();

    // ── 2. Dedup and validate ────────────────────────────────────────────────
    let (unique, duplicates) = dedup_articles(batch);
    result.duplicates_in_batch = duplicates;

    let validator = DataValidator::new();
    let before = unique.len();
    let cleaned: Vec<Article> = unique.into_iter().filter_map(|a| validator.clean(a)).collect();
    result.rejected = before - cleaned.len();

    // ── 3. Store ─────────────────────────────────────────────────────────────
    let outcome = match repo.insert_batch(&cleaned).await {
        Ok(o) => o,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Storing harvested articles failed");
            let mut progress = HarvestProgress::new(job_id, "failed", "Storage error");
            progress.error = Some(e.to_string());
            emit(progress);
            return Err(e.into());
        }
    };
    result.inserted = outcome.inserted;
    result.already_stored = outcome.skipped;
    result.duration_ms = t0.elapsed().as_millis() as u64;

    let mut done = HarvestProgress::new(
        job_id,
        "complete",
        format!("{} new article(s), {} already stored", result.inserted, result.already_stored),
    );
    done.articles_found = result.articles_found;
    emit(done);

    info!(
        job_id = %job_id,
        found = result.articles_found,
        duplicates = result.duplicates_in_batch,
        rejected = result.rejected,
        inserted = result.inserted,
        already_stored = result.already_stored,
        errors = result.errors.len(),
        duration_ms = result.duration_ms,
        "Harvest complete"
    );
    Ok(result)
}

type SourceOutcome = (Source, Result<Vec<Article>>);

async fn search_parallel(
    clients: Vec<Arc<dyn ArticleSource>>,
    query: &HarvestQuery,
    max_workers: usize,
) -> Vec<SourceOutcome> {
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for client in clients {
        let permits = Arc::clone(&permits);
        let query = query.clone();
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = client.search(&query).await;
            (client.source(), outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "Harvest task aborted"),
        }
    }
    outcomes
}

async fn search_sequential(
    clients: Vec<Arc<dyn ArticleSource>>,
    query: &HarvestQuery,
) -> Vec<SourceOutcome> {
    let mut outcomes = Vec::new();
    for (i, client) in clients.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(SEQUENTIAL_PAUSE).await;
        }
        outcomes.push((client.source(), client.search(query).await));
    }
    outcomes
}

// ── Availability ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub source: Source,
    pub name: &'static str,
    /// A harvester exists for this source.
    pub supported: bool,
    /// Listed in `search.sources`.
    pub enabled: bool,
}

/// Every known source with its support and enablement flags.
pub fn available_sources(settings: &Settings) -> Vec<SourceStatus> {
    Source::ALL
        .iter()
        .map(|&source| SourceStatus {
            source,
            name: source.display_name(),
            supported: is_supported(source),
            enabled: settings.search.sources.contains(&source),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCheck {
    pub source: Source,
    pub ok: bool,
    pub message: String,
}

/// Probe each source with a one-result query.
pub async fn test_sources(sources: &[Source], keys: &ApiKeys) -> Vec<SourceCheck> {
    let probe = HarvestQuery::new(vec!["bioinformatics".to_string()], 30, 1);
    let mut checks = Vec::new();
    for &source in sources {
        let check = match build_source(source, keys) {
            Ok(client) => match client.search(&probe).await {
                Ok(found) => SourceCheck {
                    source,
                    ok: true,
                    message: format!("reachable, {} result(s)", found.len()),
                },
                Err(e) => SourceCheck { source, ok: false, message: e.to_string() },
            },
            Err(e) => SourceCheck { source, ok: false, message: e.to_string() },
        };
        info!(%source, ok = check.ok, message = %check.message, "Source check");
        checks.push(check);
    }
    checks
}
