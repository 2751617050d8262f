//! Command-line interface.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sciagg_common::{Settings, Source};
use sciagg_ingestion::HarvestJob;

#[derive(Parser, Debug)]
#[command(name = "sciagg", author, version, about = "Scientific article aggregator", long_about = None)]
pub struct Cli {
    /// Directory holding settings.yaml and api_keys.yaml (default: $SCIAGG_CONFIG_DIR, then ./config)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest once, optionally processing articles and rebuilding the graph
    Run(RunArgs),
    /// Serve the dashboard and run the daily scheduler
    Serve(ServeArgs),
    /// Print article, post and graph counts
    Stats,
    /// Probe every configured source with a one-result query
    TestSources,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Comma-separated topics, e.g. "bioinformatics,plant microbiome"
    #[arg(long)]
    pub topics: Option<String>,
    /// Comma-separated sources, e.g. "arxiv,europepmc"
    #[arg(long)]
    pub sources: Option<String>,
    /// Days back to search
    #[arg(long)]
    pub days: Option<u32>,
    /// Maximum articles per source
    #[arg(long)]
    pub max_articles: Option<usize>,
    /// Generate summaries and posts after harvesting
    #[arg(long)]
    pub generate_posts: bool,
    /// Rebuild the knowledge graph after harvesting
    #[arg(long)]
    pub update_kg: bool,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind; defaults to web.bind
    #[arg(long)]
    pub bind: Option<String>,
    /// Do not start the daily scheduler
    #[arg(long)]
    pub no_scheduler: bool,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RunArgs {
    /// The configured harvest with command-line overrides applied.
    pub fn harvest_job(&self, settings: &Settings) -> Result<HarvestJob> {
        let mut job = HarvestJob::from_settings(settings);
        if let Some(topics) = self.topics.as_deref().map(split_list).filter(|t| !t.is_empty()) {
            job.topics = topics;
        }
        if let Some(sources) = self.sources.as_deref().map(split_list).filter(|s| !s.is_empty()) {
            job.sources = sources
                .iter()
                .map(|s| Source::from_str(s))
                .collect::<std::result::Result<_, _>>()?;
        }
        if let Some(days) = self.days {
            job.days_back = days;
        }
        if let Some(max) = self.max_articles {
            job.max_per_source = max;
        }
        anyhow::ensure!(!job.topics.is_empty(), "no topics configured; pass --topics or set topics in settings.yaml");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "sciagg",
            "run",
            "--topics",
            "soil, drought",
            "--sources",
            "arxiv,crossref",
            "--days",
            "3",
            "--max-articles",
            "5",
            "--generate-posts",
            "--config-dir",
            "/tmp/cfg",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cfg")));
        let Command::Run(args) = cli.command else { panic!("expected run") };
        assert!(args.generate_posts);
        assert!(!args.update_kg);

        let job = args.harvest_job(&Settings::default()).unwrap();
        assert_eq!(job.topics, vec!["soil", "drought"]);
        assert_eq!(job.sources, vec![Source::Arxiv, Source::Crossref]);
        assert_eq!(job.days_back, 3);
        assert_eq!(job.max_per_source, 5);
    }

    #[test]
    fn test_run_defaults_come_from_settings() {
        let settings = Settings::default();
        let job = RunArgs::default().harvest_job(&settings).unwrap();
        assert_eq!(job.topics, settings.topics);
        assert_eq!(job.days_back, settings.search.days_back);
    }

    #[test]
    fn test_unknown_source_is_an_error() {
        let args = RunArgs { sources: Some("arxiv,scihub".into()), ..Default::default() };
        assert!(args.harvest_job(&Settings::default()).is_err());
    }

    #[test]
    fn test_parse_other_commands() {
        assert!(matches!(Cli::try_parse_from(["sciagg", "stats"]).unwrap().command, Command::Stats));
        assert!(matches!(
            Cli::try_parse_from(["sciagg", "test-sources"]).unwrap().command,
            Command::TestSources
        ));
        let cli = Cli::try_parse_from(["sciagg", "serve", "--bind", "0.0.0.0:9000", "--no-scheduler"]).unwrap();
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
        assert!(args.no_scheduler);
    }
}
