//! Text helpers shared by the details merger and the indexer.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Service;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is a valid regex"))
}

/// Remove HTML tags, keeping the text between them.
///
/// The details dataset stores descriptions as HTML fragments
/// (`<p>…</p>`, `<ul><li>…`); entities are left untouched.
pub fn strip_html(text: &str) -> String {
    tag_pattern().replace_all(text, "").into_owned()
}

/// Source text used to compute a service's embedding:
/// `"{name}. {description}"` followed by each keyword, space-separated.
pub fn embedding_text(service: &Service) -> String {
    let mut text = format!("{}. {}", service.name, service.description);
    for keyword in &service.keywords {
        text.push(' ');
        text.push_str(keyword);
    }
    text
}
