//! Core data models: services, the catalog snapshot, and vector index records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ident::normalize_id;

/// Errors raised while constructing a [`Service`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("service id could not be determined from URI '{0}'")]
    MissingId(String),
}

/// One public administration service.
///
/// The `id` is either given explicitly or derived from `uri` via
/// [`normalize_id`]; a service without a derivable id cannot be built.
/// Deserialization goes through the same check, so a cache file holding an
/// id-less record fails to parse as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ServiceRecord")]
pub struct Service {
    uri: String,
    id: String,
    /// Human-readable title.
    pub name: String,
    /// Free text; the details merger appends fragments to it.
    pub description: String,
    /// Search keywords in source order, never deduplicated.
    pub keywords: Vec<String>,
}

impl Service {
    /// Build a service, deriving `id` from `uri` when `id` is empty.
    pub fn new(
        uri: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        keywords: Vec<String>,
    ) -> Result<Self, ServiceError> {
        let uri = uri.into();
        let mut id = id.into();
        if id.is_empty() {
            id = normalize_id(&uri);
        }
        if id.is_empty() {
            return Err(ServiceError::MissingId(uri));
        }
        Ok(Self {
            uri,
            id,
            name: name.into(),
            description: description.into(),
            keywords,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Wire shape of a cached service record. Missing `keywords` (or `null`)
/// means no keywords.
#[derive(Deserialize)]
struct ServiceRecord {
    uri: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

impl TryFrom<ServiceRecord> for Service {
    type Error = ServiceError;

    fn try_from(record: ServiceRecord) -> Result<Self, Self::Error> {
        Service::new(
            record.uri,
            record.id.unwrap_or_default(),
            record.name.unwrap_or_default(),
            record.description.unwrap_or_default(),
            record.keywords.unwrap_or_default(),
        )
    }
}

/// The full set of known services at a point in time.
///
/// Keyed by service id, with a parallel insertion-ordered id list so that
/// iteration order is stable (cache files and indexing batches follow it).
/// Both views are updated together on every insert.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: HashMap<String, Service>,
    order: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a service, replacing any entry with the same id.
    ///
    /// A replaced entry keeps its original position. Returns the replaced
    /// service, if any.
    pub fn insert(&mut self, service: Service) -> Option<Service> {
        let id = service.id().to_string();
        let previous = self.services.insert(id.clone(), service);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Service> {
        self.services.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.services.clear();
        self.order.clear();
    }

    /// Services in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.order.iter().filter_map(|id| self.services.get(id))
    }

    /// Owned copy of all services in insertion order.
    pub fn to_vec(&self) -> Vec<Service> {
        self.iter().cloned().collect()
    }
}

impl Extend<Service> for Catalog {
    fn extend<T: IntoIterator<Item = Service>>(&mut self, iter: T) {
        for service in iter {
            self.insert(service);
        }
    }
}

impl FromIterator<Service> for Catalog {
    fn from_iter<T: IntoIterator<Item = Service>>(iter: T) -> Self {
        let mut catalog = Catalog::new();
        catalog.extend(iter);
        catalog
    }
}

/// One entry of the vector index: a service id with its embedding,
/// display metadata, and the text the embedding was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub name: String,
    pub description: String,
    /// Source text passed to the embedding model.
    pub document: String,
}

/// A nearest-neighbor match returned by a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    /// Cosine similarity to the query vector.
    pub score: f64,
}
