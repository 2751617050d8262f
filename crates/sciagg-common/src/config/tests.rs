#[cfg(test)]
mod tests {
    use super::super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_text_limits() {
        let tp = TextProcessingConfig::default();
        assert_eq!(tp.max_summary_length, 300);
        assert_eq!(tp.max_post_length, 1500);
        assert!(tp.max_post_length > tp.max_summary_length);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
topics:
  - plant microbiome
search:
  days_back: 3
  sources: [arxiv, europepmc]
knowledge_graph:
  min_entity_frequency: 3
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.topics, vec!["plant microbiome".to_string()]);
        assert_eq!(settings.search.days_back, 3);
        assert_eq!(settings.search.sources, vec![Source::Arxiv, Source::EuropePmc]);
        assert_eq!(settings.search.max_workers, 5);
        assert_eq!(settings.knowledge_graph.min_entity_frequency, 3);
        assert_eq!(settings.knowledge_graph.max_entities, 100);
        assert_eq!(settings.output.markdown_dir, "outputs/posts");
        assert_eq!(settings.scheduler.time, "08:00");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_schedule_time() {
        let mut settings = Settings::default();
        settings.scheduler.time = "8 o'clock".into();
        assert!(settings.validate().is_err());

        settings.scheduler.time = "23:59".into();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.schedule_time().unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn test_validate_rejects_empty_sources_and_zero_workers() {
        let mut settings = Settings::default();
        settings.search.sources.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search.max_workers = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_api_keys_defaults_and_env_fallback() {
        let yaml = r#"
crossref:
  base_url: https://api.crossref.org
  mailto: me@example.org
  rate_limit: 30
"#;
        let mut keys = ApiKeys::from_yaml_str(yaml).unwrap();
        keys.apply_env(|name| match name {
            "CROSSREF_MAILTO" => Some("env@example.org".into()),
            "EUROPEPMC_EMAIL" => Some("epmc@example.org".into()),
            "LENS_API_KEY"    => Some("lens-secret".into()),
            _ => None,
        });

        // File values win over the environment.
        assert_eq!(keys.crossref.mailto.as_deref(), Some("me@example.org"));
        assert_eq!(keys.crossref.rate_limit, 30);
        assert_eq!(keys.europepmc.email.as_deref(), Some("epmc@example.org"));
        assert_eq!(keys.arxiv.base_url, "http://export.arxiv.org/api/query");
        assert_eq!(keys.arxiv.rate_limit, 10);
        assert_eq!(
            keys.lens.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("lens-secret".to_string())
        );
        assert!(keys.ieee.api_key.is_none());
    }

    #[test]
    fn test_rss_block_needs_no_base_url() {
        let yaml = r#"
rss:
  feeds:
    - https://journal.example.org/rss
    - https://lab.example.org/atom.xml
  rate_limit: 30
arxiv:
  rate_limit: 5
"#;
        let keys = ApiKeys::from_yaml_str(yaml).unwrap();
        assert_eq!(keys.for_source(Source::Rss).feeds.len(), 2);
        assert_eq!(keys.rss.rate_limit, 30);
        // A block without base_url still gets the public endpoint.
        assert_eq!(keys.arxiv.base_url, "http://export.arxiv.org/api/query");
        assert_eq!(keys.arxiv.rate_limit, 5);
        assert!(ApiKeys::default().rss.feeds.is_empty());
    }

    #[test]
    fn test_app_config_missing_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.settings.text_processing.max_summary_length, 300);
        assert_eq!(config.api_keys.for_source(Source::Medrxiv).base_url, "https://api.medrxiv.org");
    }

    #[test]
    fn test_app_config_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "database:\n  path: /tmp/x.db\nscheduler:\n  time: \"06:30\"\n",
        )
        .unwrap();
        let config = AppConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.settings.database.path, "/tmp/x.db");
        assert_eq!(config.settings.scheduler.time, "06:30");
    }
}
