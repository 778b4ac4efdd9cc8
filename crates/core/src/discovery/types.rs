//! Types for the torrent discovery pipeline.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// An unvalidated structured guess at a torrent record.
pub type CandidateRecord = Value;

/// A validated torrent listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TorrentRecord {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: String,
    /// Human readable size with a decimal unit suffix, e.g. "1.4 GB".
    pub size: String,
    /// Full magnet URI. Never truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_link: Option<String>,
    pub seeders: u64,
    pub leechers: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    /// Name of the source that listed this torrent.
    pub website_source: String,
}

/// Wire shape the language model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TorrentList {
    pub torrents: Vec<TorrentRecord>,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Candidate is not an object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Magnet link is truncated or malformed")]
    TruncatedMagnet,

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

static SIZE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(\d+(?:[.,]\d+)?)\s*([kmgtp]?)(i?)b(?:ytes)?$").unwrap()
});

impl TorrentRecord {
    /// Popularity used for ranking and filtering.
    pub fn popularity(&self) -> u64 {
        self.seeders.saturating_add(self.leechers)
    }

    /// Validate a candidate against the record schema.
    ///
    /// Numeric fields accept JSON numbers or strings such as `"1,024"`.
    /// Source membership is not checked here.
    pub fn from_candidate(candidate: &CandidateRecord) -> Result<Self, ValidationError> {
        let fields = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

        let filename = required_text(fields.get("filename"), "filename")?;
        let date = required_text(fields.get("date"), "date")?;
        let size = canonical_size(&required_text(fields.get("size"), "size")?)?;
        let magnet_link = optional_text(fields.get("magnet_link"), "magnet_link")?
            .map(check_magnet)
            .transpose()?;
        let seeders = required_count(fields.get("seeders"), "seeders")?;
        let leechers = required_count(fields.get("leechers"), "leechers")?;
        let downloads = match fields.get("downloads") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(count(value, "downloads")?),
        };
        let category = optional_text(fields.get("category"), "category")?;
        let uploader = optional_text(fields.get("uploader"), "uploader")?;
        let website_source = required_text(fields.get("website_source"), "website_source")?;

        Ok(Self {
            filename,
            category,
            date,
            size,
            magnet_link,
            seeders,
            leechers,
            downloads,
            uploader,
            website_source,
        })
    }
}

fn optional_text(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ValidationError::InvalidField {
            field,
            reason: format!("expected text, got {}", other),
        }),
    }
}

fn required_text(value: Option<&Value>, field: &'static str) -> Result<String, ValidationError> {
    optional_text(value, field)?.ok_or(ValidationError::MissingField(field))
}

fn required_count(value: Option<&Value>, field: &'static str) -> Result<u64, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => count(value, field),
    }
}

fn count(value: &Value, field: &'static str) -> Result<u64, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidField { field, reason };
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(v)
            } else if let Some(f) = n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0) {
                Ok(f as u64)
            } else {
                Err(invalid(format!("{} is not a non-negative integer", n)))
            }
        }
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            digits
                .parse::<u64>()
                .map_err(|_| invalid(format!("{:?} is not a non-negative integer", s)))
        }
        other => Err(invalid(format!("expected integer, got {}", other))),
    }
}

/// Normalize "1.4GiB" / "700 mb" into "1.4 GB" / "700 MB".
fn canonical_size(raw: &str) -> Result<String, ValidationError> {
    let caps = SIZE_PATTERN
        .captures(raw.trim())
        .ok_or_else(|| ValidationError::InvalidField {
            field: "size",
            reason: format!("unrecognized size {:?}", raw),
        })?;
    let number = &caps[1];
    let unit = caps[2].to_uppercase();
    Ok(format!("{} {}B", number, unit))
}

/// A magnet link must carry a complete info hash.
fn check_magnet(link: String) -> Result<String, ValidationError> {
    if !link.starts_with("magnet:?") {
        return Err(ValidationError::TruncatedMagnet);
    }
    let topic = link
        .split(['?', '&'])
        .find_map(|param| param.strip_prefix("xt="))
        .ok_or(ValidationError::TruncatedMagnet)?;

    if let Some(hash) = topic.strip_prefix("urn:btih:") {
        let complete = match hash.len() {
            40 => hash.chars().all(|c| c.is_ascii_hexdigit()),
            32 => hash.chars().all(|c| c.is_ascii_alphanumeric()),
            _ => false,
        };
        if !complete {
            return Err(ValidationError::TruncatedMagnet);
        }
    } else if !topic.starts_with("urn:") {
        return Err(ValidationError::TruncatedMagnet);
    }
    Ok(link)
}

/// A discovery call as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Free-text search query.
    pub query: String,
    /// Optional: limit to specific sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Optional: named model for model-assisted extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_mode: Option<String>,
}

impl DiscoveryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_extraction_mode(mut self, mode: impl Into<String>) -> Self {
        self.extraction_mode = Some(mode.into());
        self
    }
}

/// Terminal state of a discovery call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    /// At least one record survived validation and filtering.
    Found,
    /// Extraction succeeded but nothing matched.
    NoMatches,
    /// Every selected source failed to fetch (or none was selected).
    AllSourcesFailed,
    /// Every extraction attempt failed.
    ExtractionFailed,
    /// The requested extraction mode has no configured model.
    ExtractorUnavailable,
}

impl DiscoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStatus::Found => "found",
            DiscoveryStatus::NoMatches => "no_matches",
            DiscoveryStatus::AllSourcesFailed => "all_sources_failed",
            DiscoveryStatus::ExtractionFailed => "extraction_failed",
            DiscoveryStatus::ExtractorUnavailable => "extractor_unavailable",
        }
    }
}

/// Result of a discovery call with its diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    pub id: Uuid,
    pub query: String,
    /// Sorted by popularity, descending.
    pub torrents: Vec<TorrentRecord>,
    pub status: DiscoveryStatus,
    /// Extraction attempts made.
    pub attempts: u32,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    /// Sources that failed to fetch (name -> reason).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_errors: BTreeMap<String, String>,
}
