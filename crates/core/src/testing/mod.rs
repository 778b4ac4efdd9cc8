//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the fetch and completion
//! traits, so the discovery pipeline can be exercised end to end without
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_core::testing::{fixtures, MockFetcher, MockLlmClient};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.set_response(fixtures::MOCK_SOURCE, &fixtures::severance_page()).await;
//!
//! let llm = MockLlmClient::new();
//! llm.push_response(r#"{"torrents": []}"#).await;
//! ```

mod mock_fetcher;
mod mock_llm;

pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use mock_llm::MockLlmClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::discovery::{CandidateRecord, ParsingMode, Source, SourceRegistry};

    /// Structured-markup source served by the mock fetcher.
    pub const MOCK_SOURCE: &str = "mock-tracker.test";

    /// Freeform-text source served by the mock fetcher.
    pub const MOCK_FREEFORM_SOURCE: &str = "mock-board.test";

    /// A structured-markup source with a recognizable URL.
    pub fn mock_source() -> Source {
        Source::new(
            MOCK_SOURCE,
            "https://mock-tracker.test/search?q={query}",
            ParsingMode::StructuredMarkup,
            [],
        )
    }

    /// A freeform-text source that keeps local links.
    pub fn mock_freeform_source() -> Source {
        Source::new(
            MOCK_FREEFORM_SOURCE,
            "https://mock-board.test/?q={query}&s=seeders",
            ParsingMode::FreeformText,
            ["local_links".to_string()],
        )
    }

    /// Registry with the structured mock source only.
    pub fn mock_registry() -> SourceRegistry {
        SourceRegistry::new(vec![mock_source()])
    }

    /// Registry with both mock sources.
    pub fn mixed_registry() -> SourceRegistry {
        SourceRegistry::new(vec![mock_source(), mock_freeform_source()])
    }

    /// A complete magnet link with a deterministic info hash.
    pub fn magnet(n: u64, name: &str) -> String {
        format!(
            "magnet:?xt=urn:btih:{:040x}&dn={}",
            n,
            urlencoding::encode(name)
        )
    }

    /// A valid candidate as an extractor would produce it.
    pub fn candidate(name: &str, source: &str, seeders: u64, leechers: u64) -> CandidateRecord {
        json!({
            "category": "Video",
            "filename": name,
            "date": "2025-01-17",
            "size": "1.4 GiB",
            "magnet_link": magnet(seeders * 1000 + leechers, name),
            "seeders": seeders,
            "leechers": leechers,
            "uploader": "mock-uploader",
            "website_source": source,
        })
    }

    /// One listing entry in the markup a structured-markup source serves.
    ///
    /// `size` is raw markup, e.g. `"2.34&nbsp;GiB"`.
    pub fn listing_row(name: &str, size: &str, seeders: &str, leechers: &str, magnet: &str) -> String {
        format!(
            concat!(
                r#"<li><span class="list-item item-type">Video</span>"#,
                r#"<span class="list-item item-name">{}</span>"#,
                r#"<span class="list-item item-uploaded"><label title="2025-01-17">2025-01-17</label></span>"#,
                r#"<span class="item-icons"><a href="{}">Magnet</a></span>"#,
                r#"<span class="list-item item-size">{}</span>"#,
                r#"<span class="list-item item-seed">{}</span>"#,
                r#"<span class="list-item item-leech">{}</span>"#,
                r#"<span class="list-item item-user">mock-uploader</span></li>"#,
            ),
            name,
            magnet.replace('&', "&amp;"),
            size,
            seeders,
            leechers
        )
    }

    /// A listing entry whose leechers cell is missing.
    pub fn truncated_listing_row(name: &str, magnet: &str) -> String {
        format!(
            concat!(
                r#"<li><span class="list-item item-type">Video</span>"#,
                r#"<span class="list-item item-name">{}</span>"#,
                r#"<span class="list-item item-uploaded"><label title="2025-01-17">2025-01-17</label></span>"#,
                r#"<span class="item-icons"><a href="{}">Magnet</a></span>"#,
                r#"<span class="list-item item-size">700&nbsp;MiB</span>"#,
                r#"<span class="list-item item-seed">12</span>"#,
                r#"<span class="list-item item-user">mock-uploader</span></li>"#,
            ),
            name,
            magnet.replace('&', "&amp;")
        )
    }

    /// Wrap listing entries in page chrome.
    pub fn listing_page(rows: &[String]) -> String {
        format!(
            "<html><body><h1>Search results</h1>\n<ol id=\"torrents\">\n{}\n</ol>\n</body></html>",
            rows.join("\n")
        )
    }

    /// Three valid "Severance" entries plus one malformed entry.
    ///
    /// Popularity: S02E01 1500, S02E02 84, S02E03 230.
    pub fn severance_page() -> String {
        listing_page(&[
            listing_row(
                "Severance S02E01 1080p WEB H264",
                "2.34&nbsp;GiB",
                "1,200",
                "300",
                &magnet(1, "Severance S02E01"),
            ),
            listing_row(
                "Severance S02E02 720p",
                "980&nbsp;MiB",
                "80",
                "4",
                &magnet(2, "Severance S02E02"),
            ),
            truncated_listing_row("Severance S02E04 CAM", &magnet(4, "Severance S02E04")),
            listing_row(
                "Severance S02E03 2160p",
                "7.1&nbsp;GiB",
                "200",
                "30",
                &magnet(3, "Severance S02E03"),
            ),
        ])
    }

    /// Markdown-like listing as a freeform source renders it.
    pub fn freeform_listing() -> String {
        [
            "| Category | Name | Link | Size | Date | Seeders | Leechers |",
            "|---|---|---|---|---|---|---|",
            "| [Anime](/?c=1_2) | [Frieren 01 1080p](/view/1) | [](magnet:?xt=urn:btih:0000000000000000000000000000000000000010&dn=Frieren) | 1.4 GiB | 2025-01-17 | 150 | 20 |",
        ]
        .join("\n")
    }
}
