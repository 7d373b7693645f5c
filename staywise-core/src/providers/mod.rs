//! LLM provider implementations.
//!
//! Only the OpenAI-compatible chat completions protocol is built in. Use
//! [`create_provider`] to build the generator from configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatibleProvider;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::{ConfigError, Result};
use std::sync::Arc;

/// Create the generator described by `config`.
///
/// Fails when no API key can be resolved; the assistant cannot work without
/// a generator, so callers treat this as fatal.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let api_key = config.resolve_api_key()?;
    match config.provider.as_str() {
        "openai" | "openai-compatible" | "azure" | "ollama" => {
            let provider = OpenAiCompatibleProvider::new_with_key(config, api_key)?;
            tracing::debug!(provider = %config.provider, model = %config.model, "generator ready");
            Ok(Arc::new(provider))
        }
        other => Err(ConfigError::Invalid {
            message: format!("unsupported LLM provider '{}'", other),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StaywiseError;

    fn test_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            api_key: Some("test-key-123".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_create_provider_openai() {
        let provider = create_provider(&test_config("openai")).unwrap();
        assert_eq!(provider.model_name(), "test-model");
        assert!(provider.supports_json_mode());
    }

    #[test]
    fn test_create_provider_unknown() {
        let err = create_provider(&test_config("carrier-pigeon")).err().unwrap();
        assert!(matches!(err, StaywiseError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_create_provider_missing_key_is_fatal() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "STAYWISE_TEST_NO_SUCH_KEY".to_string(),
            api_key_env_fallbacks: vec![],
            ..LlmConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(
            err,
            StaywiseError::Config(ConfigError::MissingCredentials { .. })
        ));
    }
}
