//! SPARQL access to the public services register.
//!
//! [`GraphSource`] is the seam between the store and the remote graph: one
//! `SELECT` in, a list of variable bindings out. [`SparqlClient`] speaks the
//! SPARQL 1.1 protocol over HTTP (form-encoded `POST`, JSON results).
//! The query builders here are pure so they can be checked without a
//! network.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SparqlConfig;

/// One result row: variable name → literal or IRI value. Unbound
/// variables are absent.
pub type Binding = HashMap<String, String>;

/// A remote source answering SPARQL `SELECT` queries.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn select(&self, query: &str) -> Result<Vec<Binding>>;
}

/// HTTP client for a SPARQL endpoint.
pub struct SparqlClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SparqlClient {
    pub fn new(config: &SparqlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

#[async_trait]
impl GraphSource for SparqlClient {
    async fn select(&self, query: &str) -> Result<Vec<Binding>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await
            .with_context(|| format!("SPARQL request to {} failed", self.endpoint))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            bail!("SPARQL endpoint returned {}: {}", status, body);
        }
        parse_results(&body)
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    results: ResultSet,
}

#[derive(Deserialize)]
struct ResultSet {
    bindings: Vec<HashMap<String, Term>>,
}

#[derive(Deserialize)]
struct Term {
    value: String,
}

/// Parse a `application/sparql-results+json` document into bindings.
pub fn parse_results(raw: &str) -> Result<Vec<Binding>> {
    let doc: ResultsDocument =
        serde_json::from_str(raw).context("Invalid SPARQL JSON results")?;
    Ok(doc
        .results
        .bindings
        .into_iter()
        .map(|row| row.into_iter().map(|(var, term)| (var, term.value)).collect())
        .collect())
}

const PREFIXES: &str = "\
PREFIX rppl: <https://slovník.gov.cz/legislativní/sbírka/111/2009/pojem/>
PREFIX rppa: <https://slovník.gov.cz/agendový/104/pojem/>
";

const SERVICE_IRI_BASE: &str = "https://rpp-opendata.egon.gov.cz/odrpp/zdroj/služba/";
const DATA_BOX_CHANNEL: &str =
    "https://rpp-opendata.egon.gov.cz/odrpp/zdroj/typ-obslužného-kanálu/DATOVA_SCHRANKA";

/// Every public administration service with its name and description.
pub fn catalog_query() -> String {
    format!(
        "{PREFIXES}
SELECT ?uri ?name ?description
WHERE {{
  ?uri a rppl:služba-veřejné-správy ;
       rppa:má-název-služby ?name ;
       rppa:má-popis-služby ?description .
}}"
    )
}

/// Digital steps of service `id` that can be completed through a data box,
/// ordered by step IRI. `None` when `id` cannot be safely embedded in an IRI.
pub fn steps_query(id: &str) -> Option<String> {
    if !is_safe_id(id) {
        return None;
    }
    Some(format!(
        "{PREFIXES}
SELECT ?step ?name ?description
WHERE {{
  <{SERVICE_IRI_BASE}{id}> rppa:skládá-se-z-úkonu ?step .
  ?step rppa:je-digitální true ;
        rppa:má-název-úkonu-služby ?name ;
        rppa:má-popis-úkonu-služby ?description ;
        rppa:je-realizován-kanálem/rppa:má-typ-obslužného-kanálu <{DATA_BOX_CHANNEL}> .
}}
ORDER BY ?step"
    ))
}

/// Ids spliced into an IRI must not be able to close it or break the query.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '\\' | '|' | '^' | '`'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bindings_and_skips_unbound() {
        let raw = r#"{
            "head": {"vars": ["step", "name", "description"]},
            "results": {"bindings": [
                {"step": {"type": "uri", "value": "https://example.org/u1"},
                 "name": {"type": "literal", "xml:lang": "cs", "value": "Podání žádosti"}},
                {"step": {"type": "uri", "value": "https://example.org/u2"},
                 "name": {"type": "literal", "value": "Převzetí"},
                 "description": {"type": "literal", "value": "Osobně"}}
            ]}
        }"#;
        let rows = parse_results(raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Podání žádosti");
        assert!(!rows[0].contains_key("description"));
        assert_eq!(rows[1]["description"], "Osobně");
    }

    #[test]
    fn rejects_non_results_document() {
        assert!(parse_results("<html>error</html>").is_err());
        assert!(parse_results(r#"{"boolean": true}"#).is_err());
    }

    #[test]
    fn catalog_query_selects_services() {
        let q = catalog_query();
        assert!(q.contains("PREFIX rppl:"));
        assert!(q.contains("?uri a rppl:služba-veřejné-správy"));
        assert!(q.contains("rppa:má-popis-služby ?description"));
    }

    #[test]
    fn steps_query_anchors_service_iri() {
        let q = steps_query("S1234").unwrap();
        assert!(q.contains("<https://rpp-opendata.egon.gov.cz/odrpp/zdroj/služba/S1234>"));
        assert!(q.contains("rppa:je-digitální true"));
        assert!(q.contains("DATOVA_SCHRANKA>"));
        assert!(q.trim_end().ends_with("ORDER BY ?step"));
    }

    #[test]
    fn steps_query_rejects_unsafe_ids() {
        assert!(steps_query("").is_none());
        assert!(steps_query("S1> } DROP ALL { <x").is_none());
        assert!(steps_query("a b").is_none());
        assert!(steps_query("x\"y").is_none());
        assert!(steps_query("S-1_á").is_some());
    }
}
