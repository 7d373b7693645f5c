//! # Staywise Core
//!
//! Core library for the Staywise hotel assistant.
//! Provides the grounding pipeline that checks generated answers against
//! fetched hotel data, the self-correction orchestrator, the generator (LLM)
//! interface, the hotel fact source, configuration, and the HTTP gateway.

pub mod assistant;
pub mod brain;
pub mod config;
pub mod correction;
pub mod error;
pub mod gateway;
pub mod grounding;
pub mod hotels;
pub mod model;
pub mod providers;
pub mod types;

// Re-export commonly used types at the crate root.
pub use assistant::{ChatRole, ChatTurn, HotelAssistant};
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{AppConfig, GroundingConfig, load_config};
pub use correction::{CorrectionOrchestrator, CorrectionState, TurnOutcome};
pub use error::{ConfigError, FactSourceError, LlmError, Result, StaywiseError};
pub use grounding::{
    Confidence, DetectionSummary, FusionScore, GroundingPipeline, Issue, IssueKind,
    ValidationReport,
};
pub use hotels::{HotelQuery, HotelSearch, HotelSource};
pub use model::{Claim, ClaimSet, FactRecord, FactSet, Provenance, Scalar};
pub use providers::create_provider;
pub use types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
