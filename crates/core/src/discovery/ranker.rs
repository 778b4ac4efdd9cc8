//! Validation, filtering and ranking of candidates.

use tracing::debug;

use super::sources::SourceRegistry;
use super::types::{CandidateRecord, TorrentRecord, ValidationError};

/// Validate a candidate and check its source is registered.
pub fn validate_candidate(
    candidate: &CandidateRecord,
    registry: &SourceRegistry,
) -> Result<TorrentRecord, ValidationError> {
    let record = TorrentRecord::from_candidate(candidate)?;
    if !registry.contains(&record.website_source) {
        return Err(ValidationError::UnknownSource(record.website_source));
    }
    Ok(record)
}

/// Turn candidates into the final result list.
///
/// Invalid candidates are dropped, survivors need at least `min_peers`
/// seeders plus leechers, and the list is sorted by popularity (stable,
/// descending) and cut to `max_items`.
pub fn finalize(
    candidates: &[CandidateRecord],
    registry: &SourceRegistry,
    min_peers: u64,
    max_items: usize,
) -> Vec<TorrentRecord> {
    let mut records: Vec<TorrentRecord> = candidates
        .iter()
        .filter_map(|candidate| match validate_candidate(candidate, registry) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "Dropping invalid candidate");
                None
            }
        })
        .filter(|record| record.popularity() >= min_peers)
        .collect();

    records.sort_by(|a, b| b.popularity().cmp(&a.popularity()));
    records.truncate(max_items);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(name: &str, source: &str, seeders: u64, leechers: u64) -> CandidateRecord {
        json!({
            "filename": name,
            "date": "2025-01-17",
            "size": "700 MiB",
            "seeders": seeders,
            "leechers": leechers,
            "website_source": source,
        })
    }

    #[test]
    fn test_sorted_by_popularity_descending() {
        let registry = SourceRegistry::builtin();
        let candidates = vec![
            candidate("low", "nyaa.si", 1, 1),
            candidate("high", "thepiratebay.org", 100, 50),
            candidate("mid", "nyaa.si", 20, 5),
        ];

        let names: Vec<_> = finalize(&candidates, &registry, 0, 20)
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let registry = SourceRegistry::builtin();
        let candidates = vec![
            candidate("first", "nyaa.si", 5, 5),
            candidate("second", "nyaa.si", 10, 0),
            candidate("third", "nyaa.si", 0, 10),
        ];

        let names: Vec<_> = finalize(&candidates, &registry, 0, 20)
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_min_peers_and_max_items() {
        let registry = SourceRegistry::builtin();
        let candidates: Vec<_> = (0..30)
            .map(|i| candidate(&format!("r{}", i), "nyaa.si", i, 0))
            .collect();

        let records = finalize(&candidates, &registry, 10, 5);
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.popularity() >= 10));
        assert_eq!(records[0].seeders, 29);

        let none = finalize(&candidates, &registry, 1000, 5);
        assert!(none.is_empty());
    }

    #[test]
    fn test_invalid_and_foreign_candidates_dropped() {
        let registry = SourceRegistry::builtin();
        let candidates = vec![
            candidate("ok", "nyaa.si", 1, 0),
            candidate("foreign", "elsewhere.example", 50, 0),
            json!({"filename": "incomplete"}),
            json!("not an object"),
        ];

        let records = finalize(&candidates, &registry, 0, 20);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "ok");
        assert_eq!(records[0].size, "700 MB");

        assert!(matches!(
            validate_candidate(&candidates[1], &registry),
            Err(ValidationError::UnknownSource(_))
        ));
    }
}
