//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use sciagg_common::AppConfig;
use sciagg_db::{ArticleRepository, Database, RunRepository, RunStatus};
use sciagg_ingestion::{available_sources, run_harvest, test_sources};
use sciagg_kg::{GraphBuilder, KgService};
use sciagg_processor::{run_processing, ProcessingConfig};
use sciagg_scheduler::Scheduler;
use sciagg_web::AppState;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cli::{RunArgs, ServeArgs};

const CLI_RUN: &str = "cli";

/// `sciagg run`: one harvest, then the optional processing and graph steps.
pub async fn run(config: &AppConfig, db: Arc<Database>, args: &RunArgs) -> Result<()> {
    let settings = &config.settings;
    let job = args.harvest_job(settings)?;
    info!(topics = ?job.topics, sources = ?job.sources, "Running harvest");

    let runs = RunRepository::new(db.clone());
    let run_id = runs.start(CLI_RUN).await?;
    let outcome = run_steps(config, db, args, job).await;
    match &outcome {
        Ok(message) => runs.finish(run_id, RunStatus::Success, Some(message)).await?,
        Err(e) => runs.finish(run_id, RunStatus::Failed, Some(&format!("{e:#}"))).await?,
    }
    let message = outcome?;
    println!("{message}");
    Ok(())
}

async fn run_steps(
    config: &AppConfig,
    db: Arc<Database>,
    args: &RunArgs,
    job: sciagg_ingestion::HarvestJob,
) -> Result<String> {
    let repo = ArticleRepository::new(db.clone());
    let harvest = run_harvest(&job, &config.api_keys, &repo, None)
        .await
        .context("harvest failed")?;
    for e in &harvest.errors {
        warn!("{e}");
    }
    anyhow::ensure!(!harvest.all_sources_failed(), "every source failed");
    let mut lines = vec![format!(
        "Harvest: {} found, {} new, {} already stored, {} rejected",
        harvest.articles_found, harvest.inserted, harvest.already_stored, harvest.rejected
    )];
    for (source, n) in &harvest.per_source {
        lines.push(format!("  {}: {n}", source.display_name()));
    }

    if args.generate_posts {
        let processing = run_processing(
            &repo,
            &ProcessingConfig::from_settings(&config.settings),
            config.settings.scheduler.process_limit,
        )
        .await
        .context("processing failed")?;
        lines.push(format!(
            "Posts: {} processed, {} failed, written to {}",
            processing.processed, processing.failed, config.settings.output.markdown_dir
        ));
    }

    if args.update_kg {
        let plan = &config.settings.scheduler;
        let stats = KgService::new(db)
            .rebuild(&GraphBuilder::from_settings(&config.settings), plan.graph_days, plan.graph_limit)
            .await?;
        lines.push(format!(
            "Graph: {} nodes, {} edges, {} component(s)",
            stats.nodes, stats.edges, stats.components
        ));
    }

    Ok(lines.join("\n"))
}

/// `sciagg serve`: dashboard plus the daily scheduler until Ctrl-C.
pub async fn serve(config: Arc<AppConfig>, db: Arc<Database>, args: &ServeArgs) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_task = if config.settings.scheduler.enabled && !args.no_scheduler {
        let scheduler = Scheduler::new(db.clone(), config.clone());
        let next = scheduler.next_run_after(chrono::Utc::now())?;
        info!(%next, "Daily scheduler enabled");
        Some(tokio::spawn(scheduler.run_forever(shutdown_rx.clone())))
    } else {
        info!("Daily scheduler disabled");
        None
    };

    let bind = args.bind.clone().unwrap_or_else(|| config.settings.web.bind.clone());
    let mut web_shutdown = shutdown_rx;
    let server = sciagg_web::serve(AppState::new(db, config), &bind, async move {
        while !*web_shutdown.borrow_and_update() {
            if web_shutdown.changed().await.is_err() {
                break;
            }
        }
    });

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    tokio::pin!(server);
    let interrupted = tokio::select! {
        result = &mut server => {
            result?;
            false
        }
        _ = ctrl_c => true,
    };
    if interrupted {
        info!("Shutting down");
        let _ = shutdown_tx.send(true);
        server.await?;
    }

    if let Some(task) = scheduler_task {
        let _ = shutdown_tx.send(true);
        match task.await {
            Ok(result) => result?,
            Err(e) => error!(error = %e, "Scheduler task aborted"),
        }
    }
    Ok(())
}

/// `sciagg stats`
pub async fn stats(config: &AppConfig, db: Arc<Database>) -> Result<()> {
    let stats = db.stats().await?;
    let per_source = ArticleRepository::new(db.clone()).source_counts().await?;
    let graph = KgService::new(db.clone()).stats().await?;
    let last = RunRepository::new(db).recent(1).await?;

    println!("sciagg: {}", config.config_dir.display());
    println!("{}", "=".repeat(50));
    println!("Topics: {}", config.settings.topics.join(", "));
    println!(
        "Articles: {} ({} processed, {} saved, {} discarded)",
        stats.articles, stats.processed, stats.saved, stats.discarded
    );
    for (source, count) in per_source {
        println!("  {}: {count}", source.display_name());
    }
    println!("Posts: {}", stats.posts);
    println!(
        "Graph: {} nodes, {} edges, density {:.3}, {} component(s)",
        graph.nodes, graph.edges, graph.density, graph.components
    );
    for node in &graph.top_nodes {
        println!("  {} ({}, degree {})", node.name, node.kind.as_str(), node.degree);
    }
    match last.first() {
        Some(run) => println!("Last run: {} {} at {}", run.kind, run.status.as_str(), run.started_at),
        None => println!("Last run: never"),
    }
    Ok(())
}

/// `sciagg test-sources`
pub async fn check_sources(config: &AppConfig) -> Result<()> {
    for status in available_sources(&config.settings) {
        if status.enabled && !status.supported {
            warn!(source = %status.source, "Enabled but no harvester is available");
        }
    }
    let checks = test_sources(&config.settings.search.sources, &config.api_keys).await;
    let mut failed = 0;
    for check in &checks {
        let mark = if check.ok { "ok" } else { "FAIL" };
        println!("{:<12} {mark:<5} {}", check.source.display_name(), check.message);
        if !check.ok {
            failed += 1;
        }
    }
    anyhow::ensure!(failed == 0, "{failed} of {} source(s) failed", checks.len());
    Ok(())
}
