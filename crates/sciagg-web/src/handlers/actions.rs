//! Dashboard actions: collect, process and rebuild.
//!
//! Each action claims the single action slot, runs in a background task and
//! reports through SSE. Every action is recorded in the `runs` table.

use std::future::Future;
use std::str::FromStr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use sciagg_common::Source;
use sciagg_db::{ArticleRepository, RunRepository, RunStatus};
use sciagg_ingestion::{run_harvest, HarvestJob, HarvestProgress};
use sciagg_kg::{GraphBuilder, KgService};
use sciagg_processor::{run_processing, ProcessingConfig};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppEvent, SharedState};

pub type Accepted = (StatusCode, Json<serde_json::Value>);

/// Claim the action slot and run `work` in the background.
///
/// `work` yields the completion message; its error is surfaced as an error
/// notice and recorded on the run.
fn spawn_action<F>(state: &SharedState, action: &'static str, work: F) -> ApiResult<Accepted>
where
    F: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    let guard = state.try_begin_action().ok_or(ApiError::Busy)?;
    let state = state.clone();
    state.emit(AppEvent::status(action, "started", format!("{action} started")));

    tokio::spawn(async move {
        let _guard = guard;
        let runs = RunRepository::new(state.db.clone());
        let run_id = match runs.start(action).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(action, error = %e, "Could not record run start");
                None
            }
        };

        let (status, message) = match work.await {
            Ok(message) => {
                info!(action, "{message}");
                state.emit(AppEvent::status(action, "complete", message.clone()));
                (RunStatus::Success, message)
            }
            Err(e) => {
                let message = format!("{action} failed: {e:#}");
                error!(action, error = %format!("{e:#}"), "Dashboard action failed");
                state.emit(AppEvent::error(message.clone()));
                (RunStatus::Failed, message)
            }
        };

        if let Some(id) = run_id {
            if let Err(e) = runs.finish(id, status, Some(&message)).await {
                error!(action, error = %e, "Could not record run finish");
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "action": action, "status": "started" }))))
}

// ── Collect ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CollectParams {
    /// Comma-separated; defaults to the configured topics.
    pub topics: Option<String>,
    /// Comma-separated source ids; defaults to the configured sources.
    pub sources: Option<String>,
    pub days: Option<u32>,
    pub max: Option<usize>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl CollectParams {
    pub fn to_job(&self, base: HarvestJob) -> ApiResult<HarvestJob> {
        let mut job = base;
        if let Some(topics) = self.topics.as_deref().map(split_list).filter(|t| !t.is_empty()) {
            job.topics = topics;
        }
        if let Some(sources) = self.sources.as_deref().map(split_list).filter(|s| !s.is_empty()) {
            job.sources = sources
                .iter()
                .map(|s| Source::from_str(s))
                .collect::<Result<_, _>>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        }
        if let Some(days) = self.days {
            job.days_back = days;
        }
        if let Some(max) = self.max {
            job.max_per_source = max;
        }
        if job.topics.is_empty() {
            return Err(ApiError::BadRequest("no topics to search".into()));
        }
        Ok(job)
    }
}

/// POST /api/actions/collect
pub async fn collect(
    State(state): State<SharedState>,
    Query(params): Query<CollectParams>,
) -> ApiResult<Accepted> {
    let job = params.to_job(HarvestJob::from_settings(&state.config.settings))?;
    let task_state = state.clone();

    spawn_action(&state, "collect", async move {
        let (progress_tx, mut progress_rx) = broadcast::channel::<HarvestProgress>(64);
        let forward_state = task_state.clone();
        let forward = tokio::spawn(async move {
            loop {
                match progress_rx.recv().await {
                    Ok(progress) => forward_state.emit(AppEvent::Harvest(progress)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let repo = ArticleRepository::new(task_state.db.clone());
        let outcome = run_harvest(&job, &task_state.config.api_keys, &repo, Some(progress_tx)).await;
        // The sender is dropped with the harvest, which ends the forwarder.
        let _ = forward.await;

        let result = outcome?;
        for e in &result.errors {
            task_state.emit(AppEvent::Notification { level: "warning".into(), message: e.clone() });
        }
        anyhow::ensure!(!result.all_sources_failed(), "every source failed");
        Ok(format!(
            "{} article(s) found, {} new, {} already stored",
            result.articles_found, result.inserted, result.already_stored
        ))
    })
}

// ── Process ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProcessParams {
    pub limit: Option<usize>,
}

/// POST /api/actions/process
pub async fn process(
    State(state): State<SharedState>,
    Query(params): Query<ProcessParams>,
) -> ApiResult<Accepted> {
    let limit = params.limit.unwrap_or(state.config.settings.scheduler.process_limit);
    let config = ProcessingConfig::from_settings(&state.config.settings);
    let repo = ArticleRepository::new(state.db.clone());

    spawn_action(&state, "process", async move {
        let result = run_processing(&repo, &config, limit).await?;
        Ok(format!("{} processed, {} failed", result.processed, result.failed))
    })
}

// ── Rebuild ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RebuildParams {
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

/// POST /api/actions/rebuild
pub async fn rebuild(
    State(state): State<SharedState>,
    Query(params): Query<RebuildParams>,
) -> ApiResult<Accepted> {
    let plan = &state.config.settings.scheduler;
    let days = params.days.unwrap_or(plan.graph_days);
    let limit = params.limit.unwrap_or(plan.graph_limit);
    let builder = GraphBuilder::from_settings(&state.config.settings);
    let kg = KgService::new(state.db.clone());

    spawn_action(&state, "rebuild", async move {
        let stats = kg.rebuild(&builder, days, limit).await?;
        Ok(format!("graph rebuilt: {} nodes, {} edges", stats.nodes, stats.edges))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HarvestJob {
        HarvestJob {
            topics: vec!["soil".into()],
            sources: vec![Source::Arxiv],
            days_back: 7,
            max_per_source: 50,
            parallel: true,
            max_workers: 4,
        }
    }

    #[test]
    fn test_collect_defaults() {
        let job = CollectParams::default().to_job(base()).unwrap();
        assert_eq!(job.topics, vec!["soil"]);
        assert_eq!(job.sources, vec![Source::Arxiv]);
    }

    #[test]
    fn test_collect_overrides() {
        let params = CollectParams {
            topics: Some("crop yield, , microbiome".into()),
            sources: Some("crossref,biorxiv".into()),
            days: Some(2),
            max: Some(5),
        };
        let job = params.to_job(base()).unwrap();
        assert_eq!(job.topics, vec!["crop yield", "microbiome"]);
        assert_eq!(job.sources, vec![Source::Crossref, Source::Biorxiv]);
        assert_eq!(job.days_back, 2);
        assert_eq!(job.max_per_source, 5);
    }

    #[test]
    fn test_collect_rejects_unknown_source() {
        let params = CollectParams { sources: Some("arxiv,nowhere".into()), ..Default::default() };
        assert!(matches!(params.to_job(base()), Err(ApiError::BadRequest(_))));
    }
}
