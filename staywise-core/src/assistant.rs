//! Conversational turn engine.
//!
//! One call to [`HotelAssistant::chat`] is one user turn: the generator may
//! ask for a hotel search, the search results are threaded back as tool
//! output, and the final JSON-mode answer goes through the
//! [`CorrectionOrchestrator`] before it is returned.

use crate::brain::{LlmProvider, envelope_format};
use crate::config::{AppConfig, AssistantConfig, LlmConfig};
use crate::correction::{CorrectionOrchestrator, TurnOutcome};
use crate::error::{ConfigError, LlmError};
use crate::grounding::GroundingPipeline;
use crate::hotels::{HotelQuery, HotelSearch};
use crate::model::FactSet;
use crate::types::{CompletionRequest, Message, ToolDefinition};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the hotel search tool declared to the generator.
pub const SEARCH_TOOL: &str = "search_hotels";

/// Speaker of a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One entry of the caller-owned conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    fn to_message(&self) -> Message {
        match self.role {
            ChatRole::User => Message::user(&self.content),
            ChatRole::Assistant => Message::assistant(&self.content),
            ChatRole::System => Message::system(&self.content),
        }
    }
}

/// The `search_hotels(city, check_in?, check_out?)` declaration.
pub fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TOOL.to_string(),
        description: "Searches for hotels in a city using Google Hotels. Use this when the user \
                      mentions a city or asks for hotel recommendations."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to search, e.g. 'Paris', 'New York', 'Tokyo'"
                },
                "check_in": {
                    "type": "string",
                    "description": "Check-in date in YYYY-MM-DD format (optional)"
                },
                "check_out": {
                    "type": "string",
                    "description": "Check-out date in YYYY-MM-DD format (optional)"
                }
            },
            "required": ["city"]
        }),
    }
}

/// System directive for a turn on `today`.
pub fn system_prompt(today: NaiveDate) -> String {
    format!(
        r#"You are Staywise, a professional hotel booking assistant. Today is {today}.

Before answering, reason step by step: identify what the user wants, which details
(city, dates, budget, preferences) are known, and whether hotel data must be fetched.
Call the '{tool}' tool whenever a city is mentioned or hotels are requested.

Truth rules:
- Never invent hotel names, prices, ratings or addresses.
- State only facts present in the search results; names and prices must match exactly.
- If no data is available, say so instead of guessing.

Blend the data with your own reasoning: compare the options, explain trade-offs and
make a recommendation, but never change the values from the search results.
Write plain text without markdown, links or URLs. For each hotel give its name,
"Price: $X/night" and "Rating: X.X (N reviews)".

When the user is only chatting, thanking you or saying goodbye, leave 'top_hotels' empty.

Reply with a single JSON object:
{{
  "thought_process": "numbered reasoning steps",
  "response_to_user": "the answer shown to the user",
  "claims": {{
    "city": "city name",
    "top_hotels": [
      {{"name": "", "price": 0, "rating": "", "type": "", "address": "", "reviews": 0, "link": ""}}
    ]
  }}
}}"#,
        today = today.format("%Y-%m-%d"),
        tool = SEARCH_TOOL,
    )
}

/// The assistant: generator, fact search and orchestrator for one process.
pub struct HotelAssistant {
    generator: Arc<dyn LlmProvider>,
    search: HotelSearch,
    orchestrator: CorrectionOrchestrator,
    history_window: usize,
    temperature: f32,
    max_tokens: usize,
}

impl HotelAssistant {
    pub fn new(
        generator: Arc<dyn LlmProvider>,
        search: HotelSearch,
        orchestrator: CorrectionOrchestrator,
        assistant: &AssistantConfig,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            generator,
            search,
            orchestrator,
            history_window: assistant.history_window,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        }
    }

    /// Wire everything from configuration around an existing generator.
    pub fn from_config(
        config: &AppConfig,
        generator: Arc<dyn LlmProvider>,
    ) -> Result<Self, ConfigError> {
        let pipeline = GroundingPipeline::new(config.grounding.clone())?;
        Ok(Self::new(
            generator,
            HotelSearch::from_config(&config.fact_source),
            CorrectionOrchestrator::new(pipeline),
            &config.assistant,
            &config.llm,
        ))
    }

    /// Replace the fact search.
    pub fn with_search(mut self, search: HotelSearch) -> Self {
        self.search = search;
        self
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Whether searches go to a live source rather than placeholder data.
    pub fn has_live_facts(&self) -> bool {
        self.search.is_live()
    }

    fn request(&self, messages: Vec<Message>, with_tools: bool) -> CompletionRequest {
        CompletionRequest {
            messages,
            tools: with_tools.then(|| vec![search_tool()]),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: envelope_format(self.generator.as_ref()),
            model: None,
        }
    }

    /// Run one user turn. `history` is read, never modified; the caller
    /// appends the user input and [`TurnOutcome::display_text`] afterwards.
    pub async fn chat(
        &self,
        user_input: &str,
        history: &[ChatTurn],
    ) -> Result<TurnOutcome, LlmError> {
        let window = &history[history.len().saturating_sub(self.history_window)..];
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(Message::system(system_prompt(Local::now().date_naive())));
        messages.extend(window.iter().map(ChatTurn::to_message));
        messages.push(Message::user(user_input));

        let request = self.request(messages, true);
        let first = self.generator.complete(request.clone()).await?;

        let calls = first.message.content.tool_calls();
        if calls.is_empty() {
            debug!("generator answered directly");
            return self
                .orchestrator
                .run(self.generator.as_ref(), &request, &first, &FactSet::empty())
                .await;
        }

        let mut context = request.messages;
        let mut facts = FactSet::empty();
        let mut tool_results = Vec::with_capacity(calls.len());
        for call in &calls {
            if call.name != SEARCH_TOOL {
                warn!(tool = %call.name, "generator requested an unknown tool");
                tool_results.push(Message::tool_result(
                    call.id,
                    serde_json::json!({"error": "Tool not found"}).to_string(),
                    true,
                ));
                continue;
            }
            let Some(query) = HotelQuery::from_arguments(call.arguments) else {
                warn!(arguments = %call.arguments, "search_hotels called without a city");
                tool_results.push(Message::tool_result(
                    call.id,
                    serde_json::json!({"error": "A city is required"}).to_string(),
                    true,
                ));
                continue;
            };

            info!(city = %query.city, "searching hotels");
            facts = self.search.search(&query).await;
            let output = serde_json::json!({
                "city": facts.location,
                "top_hotels": facts.records,
            });
            tool_results.push(Message::tool_result(call.id, output.to_string(), false));
        }
        context.push(first.message.clone());
        context.extend(tool_results);

        let grounded_request = self.request(context, false);
        let second = self.generator.complete(grounded_request.clone()).await?;

        let mut outcome = self
            .orchestrator
            .run(self.generator.as_ref(), &grounded_request, &second, &facts)
            .await?;
        outcome.usage.accumulate(&first.usage);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_date_and_tool() {
        let prompt = system_prompt(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert!(prompt.contains("Today is 2025-03-09"));
        assert!(prompt.contains("'search_hotels'"));
        assert!(prompt.contains("\"top_hotels\""));
    }

    #[test]
    fn test_search_tool_requires_city() {
        let tool = search_tool();
        assert_eq!(tool.name, "search_hotels");
        assert_eq!(tool.parameters["required"][0], "city");
    }

    #[test]
    fn test_chat_turn_serde() {
        let turn: ChatTurn =
            serde_json::from_str(r#"{"role": "assistant", "content": "hello"}"#).unwrap();
        assert_eq!(turn, ChatTurn::assistant("hello"));
        assert!(serde_json::from_str::<ChatTurn>(r#"{"role": "robot", "content": ""}"#).is_err());
    }
}
