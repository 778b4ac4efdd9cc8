//! Registry of listing sources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::config::DiscoveryConfig;

/// Placeholder substituted with the percent-encoded query.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// How a source's pages are rendered and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMode {
    /// Cleaned HTML that the normalizer restructures into a `;`-delimited table.
    StructuredMarkup,
    /// Markdown-like text that is only cleaned, never reshaped.
    FreeformText,
}

impl ParsingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParsingMode::StructuredMarkup => "structured_markup",
            ParsingMode::FreeformText => "freeform_text",
        }
    }
}

/// An external listing site.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    name: String,
    search_url_template: String,
    parsing_mode: ParsingMode,
    excluded_rules: BTreeSet<String>,
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        search_url_template: impl Into<String>,
        parsing_mode: ParsingMode,
        excluded_rules: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            search_url_template: search_url_template.into(),
            parsing_mode,
            excluded_rules: excluded_rules.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parsing_mode(&self) -> ParsingMode {
        self.parsing_mode
    }

    pub fn excluded_rules(&self) -> &BTreeSet<String> {
        &self.excluded_rules
    }

    /// Whether the named normalization rule is skipped for this source.
    pub fn excludes(&self, rule: &str) -> bool {
        self.excluded_rules.contains(rule)
    }

    /// Build the search URL for a free-text query.
    pub fn search_url(&self, query: &str) -> String {
        self.search_url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
    }
}

/// Read-only table of known sources, in declaration order.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// The sources shipped with the service.
    pub fn builtin() -> Self {
        Self::new(vec![
            Source::new(
                "thepiratebay.org",
                "https://thepiratebay.org/search.php?q={query}",
                ParsingMode::StructuredMarkup,
                [],
            ),
            Source::new(
                "nyaa.si",
                "https://nyaa.si/?f=0&c=0_0&q={query}&s=seeders&o=desc",
                ParsingMode::FreeformText,
                ["local_links".to_string()],
            ),
        ])
    }

    /// Built-in registry unless the config declares its own sources.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        if config.sources.is_empty() {
            Self::builtin()
        } else {
            Self::new(config.sources.iter().map(Source::from).collect())
        }
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve a caller's source subset.
    ///
    /// `None` selects every source. Unknown names are ignored. The result
    /// always follows registry order, not the order the caller asked in.
    pub fn select(&self, requested: Option<&[String]>) -> Vec<&Source> {
        let Some(requested) = requested else {
            return self.sources.iter().collect();
        };

        for name in requested {
            if !self.contains(name) {
                warn!(source = %name, "Ignoring unknown source");
            }
        }

        self.sources
            .iter()
            .filter(|s| requested.iter().any(|r| r == &s.name))
            .collect()
    }
}
