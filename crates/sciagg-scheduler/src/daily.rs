//! The daily run: harvest → process → graph rebuild → digest.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use sciagg_common::AppConfig;
use sciagg_db::{ArticleRepository, Database, RunRecord, RunRepository, RunStatus};
use sciagg_ingestion::{run_harvest, HarvestJob, HarvestResult};
use sciagg_kg::{GraphBuilder, GraphStats, KgService};
use sciagg_processor::{run_processing, write_digest, ProcessingConfig, ProcessingResult};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::schedule::DailySchedule;

/// Run kind recorded in the `runs` table.
pub const DAILY_RUN: &str = "daily";

/// Articles read back for the digest.
const DIGEST_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub harvest: HarvestResult,
    pub processing: ProcessingResult,
    pub graph: GraphStats,
    pub digest: PathBuf,
    /// 1 for a first-try success.
    pub attempts: u32,
}

impl DailyReport {
    fn summary(&self) -> String {
        format!(
            "{} new article(s), {} processed, graph {} nodes / {} edges",
            self.harvest.inserted, self.processing.processed, self.graph.nodes, self.graph.edges
        )
    }
}

/// Call `attempt` until it succeeds, at most `1 + max_retries` times, sleeping
/// `delay` between tries. Returns the last error when every try fails.
pub async fn retry_run<T, F, Fut>(max_retries: u32, delay: Duration, mut attempt: F) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt(tries).await {
            Ok(value) => return Ok((value, tries)),
            Err(e) if tries <= max_retries => {
                warn!(attempt = tries, max_retries, error = %e, "Daily run failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.context(format!("daily run failed after {tries} attempt(s)"))),
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    db: Arc<Database>,
    config: Arc<AppConfig>,
}

impl Scheduler {
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// One pass over the four steps, no retries.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<DailyReport> {
        let settings = &self.config.settings;
        let plan = &settings.scheduler;
        let articles = ArticleRepository::new(self.db.clone());

        // ── 1. Harvest ───────────────────────────────────────────────────────
        let mut job = HarvestJob::from_settings(settings);
        job.max_per_source = plan.harvest_max_per_source;
        let harvest = run_harvest(&job, &self.config.api_keys, &articles, None)
            .await
            .context("harvest step")?;
        anyhow::ensure!(
            !harvest.all_sources_failed(),
            "harvest step: every source failed: {}",
            harvest.errors.join("; ")
        );

        // ── 2. Process ───────────────────────────────────────────────────────
        let processing = run_processing(&articles, &ProcessingConfig::from_settings(settings), plan.process_limit)
            .await
            .context("processing step")?;

        // ── 3. Graph ─────────────────────────────────────────────────────────
        let graph = KgService::new(self.db.clone())
            .rebuild(&GraphBuilder::from_settings(settings), plan.graph_days, plan.graph_limit)
            .await
            .context("graph step")?;

        // ── 4. Digest ────────────────────────────────────────────────────────
        let now = Utc::now();
        let today = now.date_naive();
        let midnight = today.and_time(NaiveTime::MIN).and_utc();
        let todays = articles
            .retrieved_since(midnight, DIGEST_LIMIT)
            .await
            .context("loading today's articles")?;
        let digest = write_digest(&PathBuf::from(&settings.output.markdown_dir), today, &todays, now)
            .context("writing daily digest")?;

        Ok(DailyReport { harvest, processing, graph, digest, attempts: 1 })
    }

    /// The daily run with whole-run retries, recorded in the `runs` table.
    pub async fn run_now(&self) -> Result<DailyReport> {
        let runs = RunRepository::new(self.db.clone());
        let run_id = runs.start(DAILY_RUN).await.context("recording run start")?;
        info!(run_id, "Daily run started");

        let plan = &self.config.settings.scheduler;
        let outcome = retry_run(plan.max_retries, Duration::from_secs(plan.retry_delay_secs), |_| {
            self.run_once()
        })
        .await;

        match outcome {
            Ok((mut report, attempts)) => {
                report.attempts = attempts;
                let summary = report.summary();
                runs.finish(run_id, RunStatus::Success, Some(&summary)).await?;
                info!(run_id, attempts, "Daily run complete: {summary}");
                Ok(report)
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(run_id, error = %message, "Daily run failed");
                runs.finish(run_id, RunStatus::Failed, Some(&message)).await?;
                Err(e)
            }
        }
    }

    pub async fn last_run(&self) -> Result<Option<RunRecord>> {
        Ok(RunRepository::new(self.db.clone()).last_run(DAILY_RUN).await?)
    }

    /// Next scheduled run after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        Ok(DailySchedule::from_settings(&self.config.settings)?.next_after(now))
    }

    /// Sleep until each scheduled time and run, until `shutdown` flips to true.
    pub async fn run_forever(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let schedule = DailySchedule::from_settings(&self.config.settings)?;
        if let Some(last) = self.last_run().await? {
            info!(started_at = %last.started_at, status = last.status.as_str(), "Last daily run");
        }

        loop {
            let now = Utc::now();
            let wait = schedule.wait_from(now);
            info!(next = %schedule.next_after(now), "Scheduler sleeping until next run");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler stopped");
                        return Ok(());
                    }
                    continue;
                }
            }

            if let Err(e) = self.run_now().await {
                error!(error = %format!("{e:#}"), "Scheduled run gave up");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use sciagg_common::{Settings, Source};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let (value, attempts) = retry_run(3, Duration::from_secs(60), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    anyhow::bail!("transient failure {n}");
                }
                Ok(n * 10)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 30);
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let err = retry_run::<(), _, _>(2, Duration::from_secs(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("down") }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(format!("{err:#}").contains("after 3 attempt(s)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retries() {
        let calls = AtomicU32::new(0);
        let result = retry_run::<(), _, _>(0, Duration::from_secs(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("down") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_now_without_sources_records_run() {
        let out = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.search.sources.clear();
        settings.output.markdown_dir = out.path().display().to_string();
        let config = Arc::new(AppConfig {
            config_dir: out.path().to_path_buf(),
            settings,
            api_keys: Default::default(),
        });
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let scheduler = Scheduler::new(db, config);

        let report = scheduler.run_now().await.unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.harvest.inserted, 0);
        assert_eq!(report.processing.processed, 0);
        assert_eq!(report.graph.nodes, 0);
        assert!(report.digest.exists());

        let last = scheduler.last_run().await.unwrap().unwrap();
        assert_eq!(last.kind, DAILY_RUN);
        assert_eq!(last.status, RunStatus::Success);
        assert!(last.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_run_fails_when_every_source_fails() {
        let out = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        // No harvester exists for Lens, so the only source errors out.
        settings.search.sources = vec![Source::Lens];
        settings.scheduler.max_retries = 0;
        settings.output.markdown_dir = out.path().display().to_string();
        let config = Arc::new(AppConfig {
            config_dir: out.path().to_path_buf(),
            settings,
            api_keys: Default::default(),
        });
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let scheduler = Scheduler::new(db, config);

        let err = scheduler.run_now().await.unwrap_err();
        assert!(format!("{err:#}").contains("every source failed"));

        let last = scheduler.last_run().await.unwrap().unwrap();
        assert_eq!(last.status, RunStatus::Failed);
        assert!(last.message.unwrap().contains("every source failed"));
    }
}
