use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::discovery::{ParsingMode, Source};
use crate::llm::LlmProvider;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Named language models. The name is the extraction-mode identifier
    /// callers pass to select model-assisted extraction.
    #[serde(default)]
    pub llm: BTreeMap<String, LlmConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    1789
}

/// Discovery pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Minimum seeders + leechers for a record to be returned.
    #[serde(default)]
    pub min_peers: u64,
    /// Maximum number of records returned per call.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Extraction attempts before giving up on a corpus.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Character budget per normalized source block.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Overall scrape deadline per call, in seconds.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
    /// Replaces the built-in source registry when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_peers: 0,
            max_items: default_max_items(),
            max_retries: default_max_retries(),
            max_chars: default_max_chars(),
            deadline_secs: default_deadline(),
            sources: Vec::new(),
        }
    }
}

fn default_max_items() -> usize {
    20
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_chars() -> usize {
    5000
}

fn default_deadline() -> u64 {
    60
}

/// A listing source declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    /// Query URL template containing `{query}`.
    pub search_url: String,
    pub parsing: ParsingMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_rules: Vec<String>,
}

impl From<&SourceConfig> for Source {
    fn from(config: &SourceConfig) -> Self {
        Source::new(
            config.name.clone(),
            config.search_url.clone(),
            config.parsing,
            config.exclude_rules.iter().cloned(),
        )
    }
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Per-fetch timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider.
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    /// API key (can reference env var with ${VAR_NAME}).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_timeout() -> u32 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.1
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub discovery: DiscoveryConfig,
    pub fetcher: FetcherConfig,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub llm: BTreeMap<String, SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            discovery: config.discovery.clone(),
            fetcher: config.fetcher.clone(),
            llm: config
                .llm
                .iter()
                .map(|(name, llm)| {
                    (
                        name.clone(),
                        SanitizedLlmConfig {
                            provider: llm.provider.clone(),
                            model: llm.model.clone(),
                            api_base: llm.api_base.clone(),
                            api_key_configured: llm
                                .api_key
                                .as_ref()
                                .is_some_and(|k| !k.is_empty()),
                            timeout_secs: llm.timeout_secs,
                        },
                    )
                })
                .collect(),
        }
    }
}
