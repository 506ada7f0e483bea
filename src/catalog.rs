//! Catalog sources: the local JSON cache and the remote register.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use rpp_store_core::{Catalog, Service};

use crate::sparql::{catalog_query, GraphSource};

/// Read the cache file as a whole. Any record that cannot become a
/// [`Service`] fails the read.
pub fn read_cache(path: &Path) -> Result<Vec<Service>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))
}

/// Write the catalog (in catalog order) as a pretty-printed JSON array,
/// creating parent directories as needed.
pub fn write_cache(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&catalog.to_vec())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write cache file: {}", path.display()))?;
    debug!(path = %path.display(), services = catalog.len(), "wrote catalog cache");
    Ok(())
}

/// Fetch every service from the register. Ids are derived from the
/// service IRIs; keywords start empty.
pub async fn fetch_services(graph: &dyn GraphSource) -> Result<Vec<Service>> {
    let rows = graph
        .select(&catalog_query())
        .await
        .context("Catalog query failed")?;

    let mut services = Vec::with_capacity(rows.len());
    for mut row in rows {
        let Some(uri) = row.remove("uri") else {
            continue;
        };
        let name = row.remove("name").unwrap_or_default();
        let description = row.remove("description").unwrap_or_default();
        match Service::new(uri, "", name, description, Vec::new()) {
            Ok(service) => services.push(service),
            Err(e) => warn!(error = %e, "skipping service row"),
        }
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_roundtrip_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("services.json");
        let catalog: Catalog = vec![
            Service::new("https://example.org/služba/S2", "", "Řidičský průkaz", "Vydání", vec![
                "řidič".to_string(),
            ])
            .unwrap(),
            Service::new("https://example.org/služba/S1", "", "Pas", "", vec![]).unwrap(),
        ]
        .into_iter()
        .collect();

        write_cache(&path, &catalog).unwrap();
        let restored = read_cache(&path).unwrap();

        assert_eq!(restored, catalog.to_vec());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Řidičský průkaz"));
    }

    #[test]
    fn unreadable_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");
        assert!(read_cache(&path).is_err());

        std::fs::write(&path, "[{\"uri\": \"\"}]").unwrap();
        assert!(read_cache(&path).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(read_cache(&path).is_err());
    }

    #[test]
    fn missing_keywords_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");
        std::fs::write(
            &path,
            r#"[{"uri": "https://example.org/služba/S9", "id": "S9", "name": "X", "description": "Y", "keywords": null}]"#,
        )
        .unwrap();
        let services = read_cache(&path).unwrap();
        assert_eq!(services[0].id(), "S9");
        assert!(services[0].keywords.is_empty());
    }
}
