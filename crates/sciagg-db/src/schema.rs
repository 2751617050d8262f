//! Table definitions and ordered migrations.

pub const TABLE_ARTICLES: &str = "articles";
pub const TABLE_POSTS: &str = "posts";
pub const TABLE_GRAPH_NODES: &str = "graph_nodes";
pub const TABLE_GRAPH_EDGES: &str = "graph_edges";
pub const TABLE_RUNS: &str = "runs";

/// Applied in order on every open. Each statement must be idempotent.
pub const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id               TEXT PRIMARY KEY,
        source           TEXT NOT NULL,
        external_id      TEXT NOT NULL,
        url              TEXT NOT NULL,
        doi              TEXT,
        title            TEXT NOT NULL,
        authors          TEXT NOT NULL DEFAULT '[]',
        institutions     TEXT NOT NULL DEFAULT '[]',
        topics           TEXT NOT NULL DEFAULT '[]',
        publication_date TEXT,
        abstract_text    TEXT NOT NULL DEFAULT '',
        summary          TEXT,
        post_content     TEXT,
        status           TEXT NOT NULL DEFAULT 'new',
        retrieved_at     TEXT NOT NULL,
        updated_at       TEXT NOT NULL,
        UNIQUE (source, external_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_doi ON articles(doi)",
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source)",
    "CREATE INDEX IF NOT EXISTS idx_articles_publication_date ON articles(publication_date)",
    "CREATE INDEX IF NOT EXISTS idx_articles_retrieved_at ON articles(retrieved_at)",
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        article_id    TEXT PRIMARY KEY REFERENCES articles(id) ON DELETE CASCADE,
        markdown_path TEXT NOT NULL,
        generated_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS graph_nodes (
        id        TEXT PRIMARY KEY,
        name      TEXT NOT NULL,
        kind      TEXT NOT NULL,
        frequency INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS graph_edges (
        source TEXT NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
        target TEXT NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
        weight INTEGER NOT NULL,
        PRIMARY KEY (source, target)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        kind        TEXT NOT NULL,
        started_at  TEXT NOT NULL,
        finished_at TEXT,
        status      TEXT NOT NULL,
        message     TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_runs_kind_started ON runs(kind, started_at)",
];
