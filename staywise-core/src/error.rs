//! Error types for the Staywise core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering the generator, the fact source, and configuration.
//!
//! The grounding checks themselves never fail: they report problems as
//! [`Issue`](crate::grounding::Issue) values instead.

/// Top-level error type for the Staywise core library.
#[derive(Debug, thiserror::Error)]
pub enum StaywiseError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Fact source error: {0}")]
    FactSource(#[from] FactSourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from generator (LLM provider) interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the hotel fact source.
///
/// These are recovered inside [`HotelSearch`](crate::hotels::HotelSearch) by
/// substituting placeholder data; callers of the search wrapper never see them.
#[derive(Debug, thiserror::Error)]
pub enum FactSourceError {
    #[error("Fact source API key not set (env var '{var}')")]
    MissingApiKey { var: String },

    #[error("Fact source request failed: {message}")]
    Request { message: String },

    #[error("Fact source timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Fact source returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Fact source response parse error: {message}")]
    Parse { message: String },

    #[error("Fact source returned no results for '{location}'")]
    NoResults { location: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Missing credentials: none of {vars:?} is set")]
    MissingCredentials { vars: Vec<String> },
}

/// A type alias for results using the top-level `StaywiseError`.
pub type Result<T> = std::result::Result<T, StaywiseError>;
