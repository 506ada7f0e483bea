//! Schema of the auxiliary service-details dataset and the merge step.
//!
//! The dataset ships either as a plain JSON array of items or as an object
//! wrapping that array under `"položky"`. Text fields are language-tagged
//! objects (`{"cs": "...", "en": "..."}`) holding HTML fragments; only the
//! Czech value is used. Every access goes through an explicit presence
//! check: an item that is not an object, a text field that is not a
//! language map, or a keyword entry without a Czech value is skipped, not
//! an error.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::ident::normalize_id;
use crate::models::Catalog;
use crate::text::strip_html;

/// Placeholder rendered for absent fields in detail text blocks.
pub const NOT_AVAILABLE: &str = "Není k dispozici";

/// Top-level shape of the details file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DetailsDocument {
    Items(Vec<DetailEntry>),
    /// An object without the wrapper key yields no items.
    Wrapped {
        #[serde(rename = "položky", default)]
        items: Vec<DetailEntry>,
    },
}

/// One element of the items array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DetailEntry {
    Item(Box<DetailItem>),
    Other(Value),
}

/// A language-tagged text value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Tagged(HashMap<String, Value>),
    Other(Value),
}

impl LocalizedText {
    /// The non-empty Czech value, if present.
    pub fn czech(&self) -> Option<&str> {
        match self {
            LocalizedText::Tagged(map) => map.get("cs").and_then(Value::as_str).filter(|s| !s.is_empty()),
            LocalizedText::Other(_) => None,
        }
    }
}

/// Details of a single service. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailItem {
    pub id: Option<String>,
    pub iri: Option<String>,
    pub popis: Option<LocalizedText>,
    #[serde(rename = "jaký-má-služba-benefit")]
    pub benefit: Option<LocalizedText>,
    #[serde(rename = "klíčová-slova")]
    pub keywords: Option<Vec<LocalizedText>>,
    #[serde(rename = "kde-a-jak-službu-řešit-el")]
    pub how_to_resolve: Option<LocalizedText>,
    #[serde(rename = "kdy-službu-řešit")]
    pub when_to_resolve: Option<LocalizedText>,
    #[serde(rename = "týká-se-vás-to-pokud")]
    pub applies_if: Option<LocalizedText>,
    #[serde(rename = "způsob-vyřízení-el")]
    pub resolution_method: Option<LocalizedText>,
}

impl DetailItem {
    /// Service id this item refers to: `id` if non-empty, else `iri`,
    /// normalized. Empty when neither yields an id.
    pub fn service_id(&self) -> String {
        let raw = self
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.iri.as_deref())
            .unwrap_or("");
        normalize_id(raw)
    }

    /// Czech keyword values in source order.
    pub fn czech_keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .flatten()
            .filter_map(LocalizedText::czech)
    }

    /// Multi-field text block returned by detail lookups.
    pub fn detail_text(&self) -> String {
        format!(
            "Popis: {}\nKde a jak službu řešit elektronicky: {}\nKdy službu řešit: {}\nTýká se uživatele pokud: {}\nZpůsob vyřízení: {}",
            display_text(&self.popis),
            display_text(&self.how_to_resolve),
            display_text(&self.when_to_resolve),
            display_text(&self.applies_if),
            display_text(&self.resolution_method),
        )
    }
}

/// Cleaned Czech text of a field, `None` when absent.
pub fn cleaned_czech(field: &Option<LocalizedText>) -> Option<String> {
    field.as_ref().and_then(LocalizedText::czech).map(strip_html)
}

fn display_text(field: &Option<LocalizedText>) -> String {
    cleaned_czech(field).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl DetailsDocument {
    /// Items that are JSON objects; anything else is skipped.
    pub fn items(&self) -> impl Iterator<Item = &DetailItem> {
        let entries = match self {
            DetailsDocument::Items(entries) => entries,
            DetailsDocument::Wrapped { items } => items,
        };
        entries.iter().filter_map(|entry| match entry {
            DetailEntry::Item(item) => Some(item.as_ref()),
            DetailEntry::Other(_) => None,
        })
    }

    /// First item whose normalized id equals `service_id`.
    pub fn find(&self, service_id: &str) -> Option<&DetailItem> {
        if service_id.is_empty() {
            return None;
        }
        self.items().find(|item| item.service_id() == service_id)
    }
}

/// Outcome of [`merge_details`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Object items seen in the dataset.
    pub items: usize,
    /// Items whose id matched a catalog entry.
    pub matched: usize,
}

/// Enrich catalog entries with description, benefit and keyword data.
///
/// Description and benefit fragments are appended to the existing
/// description (space-separated, original text first), except empty ones
/// and literal [`NOT_AVAILABLE`] placeholders; Czech keywords are
/// appended to the keyword list. Items with unknown ids are ignored.
pub fn merge_details(catalog: &mut Catalog, doc: &DetailsDocument) -> MergeReport {
    let mut report = MergeReport::default();

    for item in doc.items() {
        report.items += 1;
        let id = item.service_id();
        let Some(service) = catalog.get_mut(&id) else {
            continue;
        };
        report.matched += 1;

        for fragment in [cleaned_czech(&item.popis), cleaned_czech(&item.benefit)]
            .into_iter()
            .flatten()
        {
            if fragment.is_empty() || fragment == NOT_AVAILABLE {
                continue;
            }
            if !service.description.is_empty() {
                service.description.push(' ');
            }
            service.description.push_str(&fragment);
        }

        service
            .keywords
            .extend(item.czech_keywords().map(str::to_string));
    }

    report
}
