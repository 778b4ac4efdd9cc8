//! Torrent discovery pipeline.
//!
//! A call scrapes the selected sources once into an annotated corpus, then
//! runs an extraction strategy over it (tabular decoding or a language
//! model), validates and ranks the candidates, and retries extraction a
//! bounded number of times on failure.

mod extractor;
mod fetcher;
mod html;
mod model_assisted;
pub mod normalizer;
mod ranker;
mod scraper;
mod service;
mod sources;
mod tabular;
mod types;

pub use extractor::{extract_json_array, parse_candidates, ExtractionError, Extractor};
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
pub use html::{clean_html, html_to_markdown};
pub use model_assisted::{system_prompt, ModelAssistedExtractor};
pub use normalizer::{NormalizationRule, Normalizer, TABLE_HEADER};
pub use ranker::{finalize, validate_candidate};
pub use scraper::{Corpus, Scraper, DELIMITER, ERROR_PREFIX, MARKER_PREFIX};
pub use service::DiscoveryService;
pub use sources::{ParsingMode, Source, SourceRegistry, QUERY_PLACEHOLDER};
pub use tabular::{decode_corpus, TabularExtractor};
pub use types::{
    CandidateRecord, DiscoveryOutcome, DiscoveryRequest, DiscoveryStatus, TorrentList,
    TorrentRecord, ValidationError,
};
