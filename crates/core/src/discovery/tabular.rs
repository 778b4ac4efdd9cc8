//! Deterministic decoding of `;`-delimited source tables.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::extractor::{ExtractionError, Extractor};
use super::scraper::{Corpus, DELIMITER, ERROR_PREFIX, MARKER_PREFIX};
use super::types::{CandidateRecord, TorrentRecord};

/// Columns a table header must carry to be decodable.
const REQUIRED_COLUMNS: [&str; 5] = ["filename", "date", "size", "seeders", "leechers"];

/// Extracts records from the tables the normalizer produces for
/// structured-markup sources. Blocks without a table yield nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularExtractor;

impl TabularExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for TabularExtractor {
    fn name(&self) -> &str {
        "tabular"
    }

    async fn extract(&self, corpus: &Corpus) -> Result<Vec<CandidateRecord>, ExtractionError> {
        decode_corpus(corpus.text())
    }
}

/// Decode every source block of an annotated corpus.
pub fn decode_corpus(text: &str) -> Result<Vec<CandidateRecord>, ExtractionError> {
    let mut candidates = Vec::new();
    let mut block: Option<(&str, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(MARKER_PREFIX) {
            if let Some((open, _)) = &block {
                return Err(ExtractionError::MalformedCorpus(format!(
                    "block for {} is not terminated",
                    open
                )));
            }
            let source = rest.trim_end();
            let source = source.strip_suffix(':').unwrap_or(source).trim();
            block = Some((source, Vec::new()));
        } else if line.trim() == DELIMITER {
            let (source, lines) = block.take().ok_or_else(|| {
                ExtractionError::MalformedCorpus("delimiter outside a source block".to_string())
            })?;
            candidates.extend(decode_block(source, &lines)?);
        } else if let Some((_, lines)) = block.as_mut() {
            lines.push(line);
        } else if !line.trim().is_empty() {
            return Err(ExtractionError::MalformedCorpus(format!(
                "text outside a source block: {}",
                line.chars().take(60).collect::<String>()
            )));
        }
    }

    if let Some((source, _)) = block {
        return Err(ExtractionError::MalformedCorpus(format!(
            "block for {} is not terminated",
            source
        )));
    }

    Ok(candidates)
}

fn decode_block(source: &str, lines: &[&str]) -> Result<Vec<CandidateRecord>, ExtractionError> {
    let mut lines = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());

    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    if header.starts_with(ERROR_PREFIX) {
        return Ok(Vec::new());
    }
    if !header.contains(';') {
        debug!(source = %source, "Skipping block without a table");
        return Ok(Vec::new());
    }

    let columns: Vec<&str> = header.split(';').map(str::trim).collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::MalformedTable {
            source_name: source.to_string(),
            reason: format!("header is missing {}", missing.join(", ")),
        });
    }

    let mut candidates = Vec::new();
    for (row, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        if fields.len() != columns.len() {
            debug!(
                source = %source,
                row,
                expected = columns.len(),
                found = fields.len(),
                "Dropping row with wrong field count"
            );
            continue;
        }

        let mut record: Map<String, Value> = columns
            .iter()
            .zip(fields)
            .map(|(column, field)| (column.to_string(), Value::String(field.to_string())))
            .collect();
        record.insert(
            "website_source".to_string(),
            Value::String(source.to_string()),
        );
        let candidate = Value::Object(record);

        match TorrentRecord::from_candidate(&candidate) {
            Ok(_) => candidates.push(candidate),
            Err(e) => debug!(source = %source, row, error = %e, "Dropping invalid row"),
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::normalizer::TABLE_HEADER;

    const MAGNET: &str = "magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056&dn=x";

    fn row(name: &str, seeders: &str, leechers: &str) -> String {
        format!(
            "Video;{};2025-01-17;1.2 GB;{};{};{};eztv",
            name, MAGNET, seeders, leechers
        )
    }

    fn table(rows: &[String]) -> String {
        format!("{}\n{}", TABLE_HEADER, rows.join("\n"))
    }

    #[tokio::test]
    async fn test_decodes_rows_with_source() {
        let mut corpus = Corpus::new();
        corpus.push_block(
            "thepiratebay.org",
            &table(&[row("A", "10", "1"), row("B", "1,024", "0")]),
        );

        let candidates = TabularExtractor::new().extract(&corpus).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0]["filename"], "A");
        assert_eq!(candidates[1]["seeders"], "1,024");
        for candidate in &candidates {
            assert_eq!(candidate["website_source"], "thepiratebay.org");
            assert_eq!(candidate["magnet_link"], MAGNET);
        }
    }

    #[test]
    fn test_malformed_rows_dropped_individually() {
        let mut corpus = Corpus::new();
        corpus.push_block(
            "thepiratebay.org",
            &table(&[
                row("A", "10", "1"),
                "Video;short row;1.2 GB".to_string(),
                row("C", "many", "1"),
                row("D", "3", "4"),
            ]),
        );

        let candidates = decode_corpus(corpus.text()).unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c["filename"].clone()).collect();
        assert_eq!(names, vec!["A", "D"]);
    }

    #[test]
    fn test_error_and_freeform_blocks_yield_nothing() {
        let mut corpus = Corpus::new();
        corpus.push_failure("thepiratebay.org", "HTTP 503: down");
        corpus.push_block("nyaa.si", "| [Anime] | [Frieren 01](/view/1) |");
        corpus.push_block("empty.example", "");

        assert!(decode_corpus(corpus.text()).unwrap().is_empty());
    }

    #[test]
    fn test_header_without_required_columns() {
        let mut corpus = Corpus::new();
        corpus.push_block("odd.example", "name;when\nfoo;today");

        assert!(matches!(
            decode_corpus(corpus.text()),
            Err(ExtractionError::MalformedTable { source_name, .. }) if source_name == "odd.example"
        ));
    }

    #[test]
    fn test_unterminated_block() {
        let text = format!("{}thepiratebay.org:\n{}\n", MARKER_PREFIX, TABLE_HEADER);
        assert!(matches!(
            decode_corpus(&text),
            Err(ExtractionError::MalformedCorpus(_))
        ));
    }

    #[test]
    fn test_text_outside_blocks() {
        assert!(matches!(
            decode_corpus("stray text"),
            Err(ExtractionError::MalformedCorpus(_))
        ));
        assert!(decode_corpus("").unwrap().is_empty());
    }
}
