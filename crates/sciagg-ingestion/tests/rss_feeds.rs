//! Harvesting configured RSS and Atom feeds from a local server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use chrono::{Duration, Utc};
use sciagg_common::{ApiKeys, Source};
use sciagg_db::{ArticleRepository, Database};
use sciagg_ingestion::{run_harvest, HarvestJob};

fn rss() -> String {
    let today = Utc::now().format("%a, %d %b %Y 08:00:00 GMT");
    let stale = (Utc::now() - Duration::days(60)).format("%a, %d %b %Y 08:00:00 GMT");
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Plant Science Weekly</title>
    <item>
      <title>Root exudates recruit Bacillus</title>
      <link>https://journal.example.org/articles/1</link>
      <description>&lt;p&gt;Exudates shape the rhizosphere.&lt;/p&gt;</description>
      <pubDate>{today}</pubDate>
      <dc:creator>Ana Ruiz</dc:creator>
    </item>
    <item>
      <title>An old note</title>
      <link>https://journal.example.org/articles/0</link>
      <pubDate>{stale}</pubDate>
    </item>
  </channel>
</rss>"#
    )
}

fn atom() -> String {
    let today = Utc::now().format("%Y-%m-%dT08:00:00Z");
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Lab blog</title>
  <entry>
    <id>https://lab.example.org/posts/7</id>
    <title>Teaching statistics with simulations</title>
    <link href="https://lab.example.org/posts/7"/>
    <published>{today}</published>
    <summary>Simulations help students reason about variance.</summary>
    <author><name>Sam Okoro</name></author>
  </entry>
</feed>"#
    )
}

async fn serve() -> SocketAddr {
    let (rss, atom) = (rss(), atom());
    let app = Router::new()
        .route("/journal.rss", get(move || std::future::ready(rss.clone())))
        .route("/lab.atom", get(move || std::future::ready(atom.clone())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn job() -> HarvestJob {
    HarvestJob {
        topics: vec!["plant microbiome".into()],
        sources: vec![Source::Rss],
        days_back: 7,
        max_per_source: 10,
        parallel: false,
        max_workers: 1,
    }
}

fn keys(feeds: Vec<String>) -> ApiKeys {
    let mut keys = ApiKeys::default();
    keys.rss.feeds = feeds;
    keys.rss.rate_limit = 0;
    keys
}

#[tokio::test]
async fn test_harvest_rss_and_atom_feeds() {
    let addr = serve().await;
    let keys = keys(vec![
        format!("http://{addr}/journal.rss"),
        format!("http://{addr}/lab.atom"),
        // Unknown path: logged and skipped.
        format!("http://{addr}/gone.xml"),
    ]);
    let repo = ArticleRepository::new(Arc::new(Database::open_in_memory().await.unwrap()));

    let result = run_harvest(&job(), &keys, &repo, None).await.unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(!result.all_sources_failed());
    assert_eq!(result.inserted, 2);

    let post = repo.find_by_id("rss:https://lab.example.org/posts/7").await.unwrap().unwrap();
    assert_eq!(post.source, Source::Rss);
    assert_eq!(post.authors, vec!["Sam Okoro"]);

    let items = repo.list_unprocessed(10).await.unwrap();
    let journal = items.iter().find(|a| a.title == "Root exudates recruit Bacillus").unwrap();
    assert_eq!(journal.abstract_text, "Exudates shape the rhizosphere.");
    assert_eq!(journal.publication_date, Some(Utc::now().date_naive()));
    assert!(items.iter().all(|a| a.title != "An old note"));
}

#[tokio::test]
async fn test_every_feed_failing_fails_the_source() {
    let addr = serve().await;
    let keys = keys(vec![format!("http://{addr}/gone.xml")]);
    let repo = ArticleRepository::new(Arc::new(Database::open_in_memory().await.unwrap()));

    let result = run_harvest(&job(), &keys, &repo, None).await.unwrap();
    assert!(result.all_sources_failed());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(repo.count().await.unwrap(), 0);
}
