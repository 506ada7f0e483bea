//! File access for the auxiliary service-details dataset.
//!
//! The schema and merge logic live in [`rpp_store_core::details`]; this
//! module only reads the file. The file is optional: when it does not exist
//! the callers get `None` and a warning is logged.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use rpp_store_core::details::{merge_details, DetailsDocument, MergeReport};
use rpp_store_core::Catalog;

/// Parse the details file. `Ok(None)` when it does not exist.
pub fn read_details(path: &Path) -> Result<Option<DetailsDocument>> {
    if !path.exists() {
        warn!(path = %path.display(), "details file not found");
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read details file: {}", path.display()))?;
    let doc = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse details file: {}", path.display()))?;
    Ok(Some(doc))
}

/// Enrich `catalog` from the details file, if present.
pub fn merge_from_file(catalog: &mut Catalog, path: &Path) -> Result<Option<MergeReport>> {
    let Some(doc) = read_details(path)? else {
        return Ok(None);
    };
    let report = merge_details(catalog, &doc);
    debug!(items = report.items, matched = report.matched, "merged service details");
    Ok(Some(report))
}

/// Detail text block for service `id`, read fresh from the file.
pub fn detail_by_id(path: &Path, id: &str) -> Result<Option<String>> {
    let Some(doc) = read_details(path)? else {
        return Ok(None);
    };
    Ok(doc.find(id).map(|item| item.detail_text()))
}
