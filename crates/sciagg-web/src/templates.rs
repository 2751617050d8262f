//! Page templates, embedded at compile time and rendered with minijinja.
//!
//! Names ending in `.html` are auto-escaped.

use std::sync::OnceLock;

use minijinja::Environment;
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html",      include_str!("../templates/base.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("articles.html",  include_str!("../templates/articles.html")),
    ("article.html",   include_str!("../templates/article.html")),
    ("graph.html",     include_str!("../templates/graph.html")),
];

fn env() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_loader(|name| {
            Ok(TEMPLATES
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, source)| source.to_string()))
        });
        env.add_filter("idpath", id_path);
        env
    })
}

pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String, minijinja::Error> {
    env().get_template(name)?.render(ctx)
}

/// Percent-encode an article id for use as a path tail. `/` and `:` stay
/// as they are; the detail route captures the rest of the path.
pub fn id_path(id: String) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// `key=value&` pairs for non-empty values, ready to prefix another parameter.
pub fn query_prefix(pairs: &[(&str, Option<&str>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| format!("{key}={}&", id_path(v.to_string()))))
        .collect()
}
