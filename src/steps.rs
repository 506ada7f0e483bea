//! Step lookup for a single service.

use anyhow::Result;
use tracing::debug;

use crate::error::StoreError;
use crate::sparql::{steps_query, Binding, GraphSource};

/// Digital data-box steps of service `id`, in step IRI order, formatted as
/// `"name: description"` (or just `name`).
///
/// An empty id, or one that cannot be part of an IRI, yields no steps and
/// no query. A failed query is a [`StoreError::StepsQuery`].
pub async fn steps_by_id(graph: &dyn GraphSource, id: &str) -> Result<Vec<String>> {
    let Some(query) = steps_query(id) else {
        debug!(id, "no steps query for id");
        return Ok(Vec::new());
    };

    let rows = graph
        .select(&query)
        .await
        .map_err(|source| StoreError::StepsQuery {
            id: id.to_string(),
            source,
        })?;

    let steps: Vec<String> = rows.iter().filter_map(format_step).collect();
    debug!(id, steps = steps.len(), "retrieved service steps");
    Ok(steps)
}

fn format_step(row: &Binding) -> Option<String> {
    let name = row.get("name").filter(|n| !n.is_empty())?;
    match row.get("description").filter(|d| !d.is_empty()) {
        Some(description) => Some(format!("{name}: {description}")),
        None => Some(name.clone()),
    }
}
