pub mod config;
pub mod discovery;
pub mod llm;
pub mod metrics;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use discovery::{
    DiscoveryOutcome, DiscoveryRequest, DiscoveryService, DiscoveryStatus, ParsingMode, Source,
    SourceRegistry, TorrentRecord,
};
pub use llm::{create_llm_client, LlmClient, LlmError, LlmProvider};
