use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::discovery::QUERY_PLACEHOLDER;
use crate::llm::LlmProvider;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Discovery bounds are usable
/// - Custom sources have unique names and a query placeholder
/// - Every named LLM has a model and credentials or an endpoint
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let discovery = &config.discovery;
    if discovery.max_retries == 0 {
        return Err(invalid("discovery.max_retries must be at least 1"));
    }
    if discovery.max_items == 0 {
        return Err(invalid("discovery.max_items must be at least 1"));
    }
    if discovery.max_chars < 100 {
        return Err(invalid(format!(
            "discovery.max_chars must be at least 100, got {}",
            discovery.max_chars
        )));
    }
    if discovery.deadline_secs == 0 {
        return Err(invalid("discovery.deadline_secs cannot be 0"));
    }

    let mut names = HashSet::new();
    for source in &discovery.sources {
        if source.name.trim().is_empty() {
            return Err(invalid("discovery.sources: name cannot be empty"));
        }
        if !names.insert(source.name.as_str()) {
            return Err(invalid(format!(
                "discovery.sources: duplicate source name {}",
                source.name
            )));
        }
        if !source.search_url.contains(QUERY_PLACEHOLDER) {
            return Err(invalid(format!(
                "discovery.sources.{}: search_url must contain {}",
                source.name, QUERY_PLACEHOLDER
            )));
        }
    }

    if config.fetcher.timeout_secs == 0 {
        return Err(invalid("fetcher.timeout_secs cannot be 0"));
    }

    for (name, llm) in &config.llm {
        if llm.model.is_empty() {
            return Err(invalid(format!("llm.{}.model cannot be empty", name)));
        }
        // API key is optional for local Ollama and for keyless proxies
        if llm.provider != LlmProvider::Ollama && llm.api_key.is_none() && llm.api_base.is_none()
        {
            return Err(invalid(format!(
                "llm.{}: provider {:?} requires api_key or api_base",
                name, llm.provider
            )));
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(invalid(format!(
                "llm.{}.temperature must be between 0.0 and 2.0, got {}",
                name, llm.temperature
            )));
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
