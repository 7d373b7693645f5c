//! Configuration system for Staywise.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/staywise/config.toml` and/or `.staywise/config.toml`
//! in the workspace directory.
//!
//! The resulting [`AppConfig`] is built once at startup and handed by reference
//! to the components that need it. Pipeline code never reads the environment.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for Staywise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub fact_source: FactSourceConfig,
    pub grounding: GroundingConfig,
    pub assistant: AssistantConfig,
    pub server: ServerConfig,
}

/// Generator (LLM provider) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Only "openai" (and OpenAI-compatible endpoints) is built in.
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Additional environment variables tried in order when `api_key_env` is unset.
    #[serde(default)]
    pub api_key_env_fallbacks: Vec<String>,
    /// Explicit API key. Takes precedence over the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Default temperature for generation.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key_env_fallbacks: vec!["OPEN_AI_API_KEY".to_string()],
            api_key: None,
            base_url: None,
            max_tokens: 2048,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.temperature < 0.0 || self.temperature > 2.0 {
            warnings.push(format!(
                "temperature ({}) is outside the typical range 0.0-2.0",
                self.temperature
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; requests will fail immediately".to_string());
        }
        warnings
    }

    /// All environment variable names consulted for the API key, in order.
    pub fn key_env_candidates(&self) -> Vec<String> {
        std::iter::once(self.api_key_env.clone())
            .chain(self.api_key_env_fallbacks.iter().cloned())
            .collect()
    }

    /// Resolve the API key from the explicit value or the environment.
    ///
    /// Surrounding whitespace is stripped; blank values count as unset.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim)
            && !key.is_empty()
        {
            return Ok(key.to_string());
        }
        let candidates = self.key_env_candidates();
        candidates
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or(ConfigError::MissingCredentials { vars: candidates })
    }
}

/// Hotel fact-source (SerpAPI Google Hotels) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactSourceConfig {
    /// Environment variable name containing the SerpAPI key.
    pub api_key_env: String,
    /// Explicit API key. Takes precedence over the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Search endpoint.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of records kept per search.
    pub max_results: usize,
    pub currency: String,
    pub adults: u32,
    /// Google country code (`gl`).
    pub country: String,
    /// Google interface language (`hl`).
    pub language: String,
}

impl Default for FactSourceConfig {
    fn default() -> Self {
        Self {
            api_key_env: "SERPAPI_KEY".to_string(),
            api_key: None,
            base_url: "https://serpapi.com/search".to_string(),
            timeout_secs: 15,
            max_results: 5,
            currency: "USD".to_string(),
            adults: 2,
            country: "us".to_string(),
            language: "en".to_string(),
        }
    }
}

impl FactSourceConfig {
    /// Resolve the SerpAPI key, if any. A missing key is not an error:
    /// the search falls back to placeholder data.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Thresholds and lexicons for the grounding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Maximum absolute price difference treated as rounding.
    pub price_tolerance: f64,
    /// Maximum absolute rating difference treated as rounding.
    pub rating_tolerance: f64,
    /// Substring name matches need the shorter name to be longer than this.
    pub min_fuzzy_name_len: usize,
    /// Prices below this are implausible.
    pub min_plausible_price: f64,
    /// Prices above this are implausible.
    pub max_plausible_price: f64,
    /// Identical values across at least this many claims are suspicious.
    pub uniformity_min_count: usize,
    /// Issue messages embedded in a correction directive.
    pub max_directive_issues: usize,
    /// Valid names listed in a hallucinated-entity message.
    pub max_sample_names: usize,
    /// Overconfidence lexicon (case-insensitive substrings).
    pub overconfidence_terms: Vec<String>,
    /// Superlative lexicon (case-insensitive substrings).
    pub superlative_terms: Vec<String>,
    /// Regular expression for currency amounts in free text.
    pub currency_pattern: String,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            price_tolerance: 1.0,
            rating_tolerance: 0.1,
            min_fuzzy_name_len: 5,
            min_plausible_price: 10.0,
            max_plausible_price: 10_000.0,
            uniformity_min_count: 3,
            max_directive_issues: 5,
            max_sample_names: 3,
            overconfidence_terms: ["definitely", "certainly", "guaranteed", "always", "never fails"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            superlative_terms: [
                "the best hotel",
                "top rated",
                "most popular",
                "highly recommended",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            currency_pattern: r"[$€£]\d+".to_string(),
        }
    }
}

impl GroundingConfig {
    /// Validate the thresholds and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.price_tolerance < 0.0 || self.rating_tolerance < 0.0 {
            warnings.push("negative tolerance; every comparison will disagree".to_string());
        }
        if self.min_plausible_price >= self.max_plausible_price {
            warnings.push(format!(
                "min_plausible_price ({}) >= max_plausible_price ({})",
                self.min_plausible_price, self.max_plausible_price
            ));
        }
        if self.uniformity_min_count < 2 {
            warnings.push(
                "uniformity_min_count below 2 flags every single-claim response".to_string(),
            );
        }
        if regex::Regex::new(&self.currency_pattern).is_err() {
            warnings.push(format!(
                "currency_pattern '{}' is not a valid regular expression",
                self.currency_pattern
            ));
        }
        warnings
    }
}

/// Conversational turn engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Number of most recent history turns sent to the generator.
    pub history_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { history_window: 10 }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`; `index.html` is served at `/`.
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8015,
            static_dir: "static".to_string(),
        }
    }
}

/// Load configuration from all sources, merging them in priority order.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `STAYWISE_`)
/// 3. Workspace-local config (`.staywise/config.toml`)
/// 4. User config (`~/.config/staywise/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AppConfig>,
) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "staywise", "staywise") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".staywise").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // STAYWISE_LLM__MODEL, STAYWISE_SERVER__PORT, etc.
    figment = figment.merge(Env::prefixed("STAYWISE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
