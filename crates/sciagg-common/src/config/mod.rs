//! Configuration loading for sciagg.
//! Reads `settings.yaml` and `api_keys.yaml` from the config directory given on the
//! command line, the `SCIAGG_CONFIG_DIR` env var, or `./config`.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SciaggError};
use crate::models::Source;

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const API_KEYS_FILE: &str = "api_keys.yaml";

// ── settings.yaml ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub text_processing: TextProcessingConfig,
    #[serde(default)]
    pub knowledge_graph: GraphConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub web: WebConfig,
}

fn default_topics() -> Vec<String> {
    ["bioinformatics", "machine learning", "genomics"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            search: SearchConfig::default(),
            text_processing: TextProcessingConfig::default(),
            knowledge_graph: GraphConfig::default(),
            database: DatabaseConfig::default(),
            output: OutputConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_max_articles")]
    pub max_articles_per_source: usize,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    #[serde(default = "bool_true")]
    pub parallel: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_days_back()    -> u32   { 7 }
fn default_max_articles() -> usize { 50 }
fn default_max_workers()  -> usize { 5 }
fn bool_true()            -> bool  { true }

fn default_sources() -> Vec<Source> {
    vec![Source::Arxiv, Source::EuropePmc, Source::Crossref, Source::Biorxiv]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            max_articles_per_source: default_max_articles(),
            sources: default_sources(),
            parallel: bool_true(),
            max_workers: default_max_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProcessingConfig {
    #[serde(default = "default_summary_length")]
    pub max_summary_length: usize,
    #[serde(default = "default_post_length")]
    pub max_post_length: usize,
    #[serde(default = "default_summary_style")]
    pub summary_style: String,
}

fn default_summary_length() -> usize  { 300 }
fn default_post_length()    -> usize  { 1500 }
fn default_summary_style()  -> String { "casual".to_string() }

impl Default for TextProcessingConfig {
    fn default() -> Self {
        Self {
            max_summary_length: default_summary_length(),
            max_post_length: default_post_length(),
            summary_style: default_summary_style(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_min_entity_frequency")]
    pub min_entity_frequency: u32,
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,
    #[serde(default = "default_min_edge_weight")]
    pub min_edge_weight: u32,
}

fn default_min_entity_frequency() -> u32   { 2 }
fn default_max_entities()         -> usize { 100 }
fn default_min_edge_weight()      -> u32   { 1 }

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_entity_frequency: default_min_entity_frequency(),
            max_entities: default_max_entities(),
            min_edge_weight: default_min_edge_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "data/articles.db".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_markdown_dir")]
    pub markdown_dir: String,
    #[serde(default = "bool_true")]
    pub include_metadata: bool,
}

fn default_markdown_dir() -> String { "outputs/posts".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            markdown_dir: default_markdown_dir(),
            include_metadata: bool_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Local time of day, `HH:MM`.
    #[serde(default = "default_schedule_time")]
    pub time: String,
    /// `local` or `utc`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_scheduled_harvest")]
    pub harvest_max_per_source: usize,
    #[serde(default = "default_scheduled_process")]
    pub process_limit: usize,
    #[serde(default = "default_graph_days")]
    pub graph_days: u32,
    #[serde(default = "default_graph_limit")]
    pub graph_limit: usize,
}

fn default_schedule_time()     -> String { "08:00".to_string() }
fn default_timezone()          -> String { "local".to_string() }
fn default_max_retries()       -> u32    { 3 }
fn default_retry_delay()       -> u64    { 300 }
fn default_scheduled_harvest() -> usize  { 10 }
fn default_scheduled_process() -> usize  { 20 }
fn default_graph_days()        -> u32    { 30 }
fn default_graph_limit()       -> usize  { 100 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: bool_true(),
            time: default_schedule_time(),
            timezone: default_timezone(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            harvest_max_per_source: default_scheduled_harvest(),
            process_limit: default_scheduled_process(),
            graph_days: default_graph_days(),
            graph_limit: default_graph_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3000".to_string() }

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut keys: Self = serde_yaml::from_str(content)?;
        let defaults = Self::default();
        for source in Source::ALL {
            let block = keys.for_source_mut(source);
            if block.base_url.trim().is_empty() {
                block.base_url = defaults.for_source(source).base_url.clone();
            }
        }
        Ok(keys)
    }

    /// Load settings from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parsed daily run time.
    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.scheduler.time, "%H:%M").map_err(|e| {
            SciaggError::Config(format!(
                "scheduler.time '{}' is not HH:MM: {e}",
                self.scheduler.time
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule_time()?;
        if !matches!(self.scheduler.timezone.as_str(), "local" | "utc") {
            return Err(SciaggError::Config(format!(
                "scheduler.timezone must be 'local' or 'utc', got '{}'",
                self.scheduler.timezone
            )));
        }
        if self.search.sources.is_empty() {
            return Err(SciaggError::Config("search.sources is empty".into()));
        }
        if self.search.max_workers == 0 {
            return Err(SciaggError::Config("search.max_workers must be > 0".into()));
        }
        if self.text_processing.max_summary_length == 0 || self.text_processing.max_post_length == 0 {
            return Err(SciaggError::Config("text_processing limits must be > 0".into()));
        }
        if self.knowledge_graph.max_entities == 0 {
            return Err(SciaggError::Config("knowledge_graph.max_entities must be > 0".into()));
        }
        Ok(())
    }
}

// ── api_keys.yaml ────────────────────────────────────────────────────────────

/// Per-source endpoint and credential block.
#[derive(Debug, Deserialize)]
pub struct SourceKeys {
    /// Blank or missing means the public endpoint for the source.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Contact address sent to Europe PMC.
    #[serde(default)]
    pub email: Option<String>,
    /// Polite-pool address sent to Crossref.
    #[serde(default)]
    pub mailto: Option<String>,
    /// Requests per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Feed URLs polled by the RSS source.
    #[serde(default)]
    pub feeds: Vec<String>,
}

fn default_rate_limit() -> u32 { 10 }

impl SourceKeys {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
            email: None,
            mailto: None,
            rate_limit: default_rate_limit(),
            feeds: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiKeys {
    #[serde(default = "default_arxiv")]
    pub arxiv: SourceKeys,
    #[serde(default = "default_europepmc")]
    pub europepmc: SourceKeys,
    #[serde(default = "default_crossref")]
    pub crossref: SourceKeys,
    #[serde(default = "default_biorxiv")]
    pub biorxiv: SourceKeys,
    #[serde(default = "default_medrxiv")]
    pub medrxiv: SourceKeys,
    #[serde(default = "default_lens")]
    pub lens: SourceKeys,
    #[serde(default = "default_ieee")]
    pub ieee: SourceKeys,
    #[serde(default = "default_rss")]
    pub rss: SourceKeys,
}

fn default_arxiv()     -> SourceKeys { SourceKeys::with_base_url("http://export.arxiv.org/api/query") }
fn default_europepmc() -> SourceKeys { SourceKeys::with_base_url("https://www.ebi.ac.uk/europepmc/webservices/rest") }
fn default_crossref()  -> SourceKeys { SourceKeys::with_base_url("https://api.crossref.org") }
fn default_biorxiv()   -> SourceKeys { SourceKeys::with_base_url("https://api.biorxiv.org") }
fn default_medrxiv()   -> SourceKeys { SourceKeys::with_base_url("https://api.medrxiv.org") }
fn default_lens()      -> SourceKeys { SourceKeys::with_base_url("https://api.lens.org") }
fn default_ieee()      -> SourceKeys { SourceKeys::with_base_url("https://ieeexploreapi.ieee.org") }
fn default_rss()       -> SourceKeys { SourceKeys::with_base_url("") }

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            arxiv: default_arxiv(),
            europepmc: default_europepmc(),
            crossref: default_crossref(),
            biorxiv: default_biorxiv(),
            medrxiv: default_medrxiv(),
            lens: default_lens(),
            ieee: default_ieee(),
            rss: default_rss(),
        }
    }
}

impl ApiKeys {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load API keys from `path`; a missing file yields the public defaults.
    /// Either way, unset credentials are filled from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut keys = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&content)?
        } else {
            debug!(path = %path.display(), "API keys file not found, using environment");
            Self::default()
        };
        keys.apply_env(|name| std::env::var(name).ok());
        Ok(keys)
    }

    /// Fill unset credentials from `lookup`, which maps an env var name to its value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.europepmc.email.is_none() {
            self.europepmc.email = lookup("EUROPEPMC_EMAIL");
        }
        if self.crossref.mailto.is_none() {
            self.crossref.mailto = lookup("CROSSREF_MAILTO");
        }
        if self.lens.api_key.is_none() {
            self.lens.api_key = lookup("LENS_API_KEY").map(SecretString::from);
        }
        if self.ieee.api_key.is_none() {
            self.ieee.api_key = lookup("IEEE_API_KEY").map(SecretString::from);
        }
    }

    pub fn for_source(&self, source: Source) -> &SourceKeys {
        match source {
            Source::Arxiv     => &self.arxiv,
            Source::EuropePmc => &self.europepmc,
            Source::Crossref  => &self.crossref,
            Source::Biorxiv   => &self.biorxiv,
            Source::Medrxiv   => &self.medrxiv,
            Source::Lens      => &self.lens,
            Source::Ieee      => &self.ieee,
            Source::Rss       => &self.rss,
        }
    }

    fn for_source_mut(&mut self, source: Source) -> &mut SourceKeys {
        match source {
            Source::Arxiv     => &mut self.arxiv,
            Source::EuropePmc => &mut self.europepmc,
            Source::Crossref  => &mut self.crossref,
            Source::Biorxiv   => &mut self.biorxiv,
            Source::Medrxiv   => &mut self.medrxiv,
            Source::Lens      => &mut self.lens,
            Source::Ieee      => &mut self.ieee,
            Source::Rss       => &mut self.rss,
        }
    }
}

// ── Combined ─────────────────────────────────────────────────────────────────

/// Everything loaded from the config directory.
#[derive(Debug)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub settings: Settings,
    pub api_keys: ApiKeys,
}

impl AppConfig {
    /// Resolve the config directory: explicit argument, then `SCIAGG_CONFIG_DIR`, then `./config`.
    pub fn resolve_dir(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SCIAGG_CONFIG_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("config"))
    }

    pub fn load(explicit_dir: Option<&Path>) -> Result<Self> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();

        let config_dir = Self::resolve_dir(explicit_dir);
        let settings = Settings::load(&config_dir.join(SETTINGS_FILE))?;
        settings.validate()?;
        let api_keys = ApiKeys::load(&config_dir.join(API_KEYS_FILE))?;

        Ok(Self { config_dir, settings, api_keys })
    }
}

mod tests;
