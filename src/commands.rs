//! Command implementations behind the `rpp` binary.
//!
//! Each `run_*` function drives one [`ServiceStore`] operation and prints
//! its result to stdout. Diagnostics go through `tracing` (stderr).

use anyhow::{bail, Result};

use rpp_store_core::indexer::IndexReport;
use rpp_store_core::Service;

use crate::store::ServiceStore;

pub async fn run_load(store: &mut ServiceStore) -> Result<()> {
    store.load().await?;
    println!("load");
    println!("  services: {}", store.len());
    println!("  cache: {}", store.config().paths.cache.display());
    Ok(())
}

pub async fn run_search(
    store: &mut ServiceStore,
    query: &str,
    mode: &str,
    limit: usize,
) -> Result<()> {
    store.load().await?;
    let results = match mode {
        "semantic" => store.search(query, limit).await?,
        "keyword" => store.keyword_search(query, limit),
        other => bail!("Unknown search mode: '{}'. Must be semantic or keyword.", other),
    };

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, service) in results.iter().enumerate() {
        println!("{}. {}", i + 1, service.name);
        print_summary(service);
        println!();
    }
    Ok(())
}

pub async fn run_get(store: &mut ServiceStore, id: &str) -> Result<()> {
    store.load().await?;
    let Some(service) = store.service(id) else {
        bail!("Service not found: {}", id);
    };

    println!("--- Service ---");
    println!("id:          {}", service.id());
    println!("uri:         {}", service.uri());
    println!("name:        {}", service.name);
    if !service.keywords.is_empty() {
        println!("keywords:    {}", service.keywords.join(", "));
    }
    println!();
    println!("--- Description ---");
    println!("{}", service.description);
    Ok(())
}

pub fn run_detail(store: &ServiceStore, id: &str) -> Result<()> {
    match store.get_detail_by_id(id)? {
        Some(text) => println!("{}", text),
        None => println!("No details for service {}.", id),
    }
    Ok(())
}

pub async fn run_steps(store: &ServiceStore, id: &str) -> Result<()> {
    let steps = store.get_steps_by_id(id).await?;
    if steps.is_empty() {
        println!("No digital steps for service {}.", id);
        return Ok(());
    }
    for (i, step) in steps.iter().enumerate() {
        println!("{}. {}", i + 1, step);
    }
    Ok(())
}

pub async fn run_stats(store: &mut ServiceStore, json: bool) -> Result<()> {
    store.load().await?;
    let stats = store.embedding_statistics().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Embedding statistics");
    println!("  services:    {}", stats.total_services);
    println!("  embeddings:  {}", stats.total_embeddings);
    println!("  coverage:    {:.2}%", stats.coverage_percentage);
    println!("  computed:    {}", stats.embeddings_computed);
    Ok(())
}

pub async fn run_embed_pending(store: &mut ServiceStore) -> Result<()> {
    store.load().await?;
    let report = store.compute_embeddings().await?;
    print_report("embed pending", &report);
    Ok(())
}

pub async fn run_embed_rebuild(store: &mut ServiceStore) -> Result<()> {
    store.load().await?;
    let report = store.rebuild_embeddings().await?;
    print_report("embed rebuild", &report);
    Ok(())
}

fn print_summary(service: &Service) {
    println!("    id: {}", service.id());
    if !service.description.is_empty() {
        println!("    {}", snippet(&service.description, 200));
    }
}

fn print_report(title: &str, report: &IndexReport) {
    println!("{}", title);
    if report.pending == 0 {
        println!("  all services up to date");
        return;
    }
    println!("  already indexed: {}", report.already_indexed);
    println!("  pending: {}", report.pending);
    println!("  embedded: {}", report.embedded);
    println!("  batches: {}", report.batches);
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}
