//! Correction orchestrator: the bounded self-correction loop.
//!
//! The first generation is checked by the full [`GroundingPipeline`]. When a
//! critical issue is found the generator is called exactly once more with a
//! correction directive, and only grounding is re-checked on the result.
//! Output that does not parse as the response envelope is passed through
//! verbatim at either stage.

use crate::brain::{LlmProvider, envelope_format};
use crate::error::LlmError;
use crate::grounding::{GroundingPipeline, Issue, ValidationReport};
use crate::model::{ClaimSet, FactSet, Provenance, ResponseEnvelope};
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where the orchestrator is in one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionState {
    /// Generator output and facts are available.
    Initial,
    /// All checks have run.
    Checked,
    /// No critical issue was found.
    Clean,
    /// A critical issue was found and a directive is being sent.
    NeedsCorrection,
    /// The first output is final.
    Done,
    /// The regenerated output is final.
    Corrected,
}

impl CorrectionState {
    fn can_transition_to(self, next: CorrectionState) -> bool {
        use CorrectionState::*;
        matches!(
            (self, next),
            (Initial, Checked)
                | (Initial, Done)
                | (Checked, Clean)
                | (Checked, NeedsCorrection)
                | (Clean, Done)
                | (NeedsCorrection, Corrected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CorrectionState::Done | CorrectionState::Corrected)
    }
}

/// Result of one orchestrated turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// The final generator output, unparsed.
    pub output: String,
    pub state: CorrectionState,
    /// Report on the first generation, when it parsed.
    pub report: Option<ValidationReport>,
    /// Grounding issues left after a correction.
    pub residual_issues: Vec<Issue>,
    pub provenance: Provenance,
    pub usage: TokenUsage,
}

impl TurnOutcome {
    pub fn was_corrected(&self) -> bool {
        self.state == CorrectionState::Corrected
    }

    fn envelope(&self) -> Option<ResponseEnvelope> {
        ResponseEnvelope::parse(&self.output).ok()
    }

    /// The user-facing answer: `response_to_user`, or the raw output when it
    /// is not an envelope.
    pub fn display_text(&self) -> String {
        match self.envelope() {
            Some(env) if !env.response_to_user.is_empty() => env.response_to_user,
            Some(_) => String::new(),
            None => self.output.clone(),
        }
    }

    /// The generator's reasoning trace, if it provided one.
    pub fn reasoning(&self) -> Option<String> {
        self.envelope()
            .map(|env| env.thought_process)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Drives checking and the single correction round-trip.
#[derive(Debug)]
pub struct CorrectionOrchestrator {
    pipeline: GroundingPipeline,
}

impl CorrectionOrchestrator {
    pub fn new(pipeline: GroundingPipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &GroundingPipeline {
        &self.pipeline
    }

    /// Validate `first` (the response to `context`) and correct it if needed.
    ///
    /// `context` is the request that produced `first`; a correction reuses its
    /// messages with the directive appended. A generator error during the
    /// correction call is returned to the caller.
    pub async fn run(
        &self,
        generator: &dyn LlmProvider,
        context: &CompletionRequest,
        first: &CompletionResponse,
        facts: &FactSet,
    ) -> Result<TurnOutcome, LlmError> {
        let raw = response_text(first);
        let mut state = CorrectionState::Initial;
        let mut outcome = TurnOutcome {
            output: raw.clone(),
            state,
            report: None,
            residual_issues: Vec::new(),
            provenance: facts.provenance.clone(),
            usage: first.usage,
        };

        let claims = match ClaimSet::parse(&raw) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "generator output is not a response envelope; passing through");
                advance(&mut state, CorrectionState::Done);
                outcome.state = state;
                return Ok(outcome);
            }
        };

        let report = self.pipeline.check(facts, &claims);
        advance(&mut state, CorrectionState::Checked);
        log_report(&report);

        if !report.has_critical_issues() {
            advance(&mut state, CorrectionState::Clean);
            advance(&mut state, CorrectionState::Done);
            outcome.state = state;
            outcome.report = Some(report);
            return Ok(outcome);
        }

        advance(&mut state, CorrectionState::NeedsCorrection);
        let directive = correction_directive(&report, self.pipeline.config().max_directive_issues);
        let mut request = context.clone();
        request.messages.push(Message::system(directive));
        request.tools = None;
        request.response_format = envelope_format(generator);

        let corrected = generator.complete(request).await?;
        outcome.usage.accumulate(&corrected.usage);
        let corrected_raw = response_text(&corrected);

        match ClaimSet::parse(&corrected_raw) {
            Ok(corrected_claims) => {
                let residual = self.pipeline.verify(facts, &corrected_claims);
                if residual.is_empty() {
                    info!("correction resolved all grounding issues");
                } else {
                    warn!(
                        residual = residual.len(),
                        "corrected response still has grounding issues; returning it anyway"
                    );
                    for issue in &residual {
                        debug!(kind = ?issue.kind, message = %issue.message, "residual issue");
                    }
                }
                outcome.residual_issues = residual;
            }
            Err(e) => {
                warn!(error = %e, "corrected output is not a response envelope; passing through");
            }
        }

        advance(&mut state, CorrectionState::Corrected);
        outcome.output = corrected_raw;
        outcome.state = state;
        outcome.report = Some(report);
        Ok(outcome)
    }
}

fn advance(state: &mut CorrectionState, next: CorrectionState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {:?} -> {:?}",
        state,
        next
    );
    debug!(from = ?state, to = ?next, "correction state");
    *state = next;
}

fn response_text(response: &CompletionResponse) -> String {
    response
        .message
        .content
        .as_text()
        .unwrap_or_default()
        .to_string()
}

fn log_report(report: &ValidationReport) {
    let summary = &report.summary;
    let fusion = &report.fusion;
    info!(
        score = fusion.score,
        grade = %fusion.grade,
        valid = fusion.is_valid,
        meaningful = fusion.is_meaningful,
        synthesis = ?fusion.synthesis,
        "fusion quality"
    );
    for issue in &fusion.issues {
        debug!(kind = ?issue.kind, message = %issue.message, "fusion issue");
    }
    if summary.total_issues == 0 {
        return;
    }
    warn!(
        total = summary.total_issues,
        grounding = summary.grounding_issues,
        consistency = summary.consistency_issues,
        plausibility = summary.plausibility_concerns,
        misinformation = summary.misinformation_patterns,
        critical = summary.has_critical_issues,
        confidence = ?summary.confidence,
        "hallucination detection summary"
    );
    for issue in &report.issues {
        debug!(kind = ?issue.kind, message = %issue.message, "detected issue");
    }
}

/// Compose the system directive sent with the correction call.
pub fn correction_directive(report: &ValidationReport, limit: usize) -> String {
    let mut directive = format!(
        "Your previous response contained {} issue(s) compared to the hotel search results:\n",
        report.summary.total_issues
    );
    for message in report.directive_messages(limit) {
        directive.push_str(&format!("- {}\n", message));
    }
    directive.push_str(
        "\nRegenerate the response now. Use only hotel names, prices and ratings that appear \
         in the search results, and do not invent or modify any of them. \
         Reply in the same JSON format.",
    );
    directive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::config::GroundingConfig;
    use crate::model::FactRecord;
    use crate::types::ResponseFormat;

    fn orchestrator() -> CorrectionOrchestrator {
        CorrectionOrchestrator::new(GroundingPipeline::new(GroundingConfig::default()).unwrap())
    }

    fn paris() -> FactSet {
        FactSet::new(
            "Paris",
            vec![FactRecord::named("Grand Hotel Paris").with_price(150.0).with_rating(4.5)],
            Provenance::Live {
                source: "test".into(),
            },
            5,
        )
    }

    fn envelope(name: &str, price: f64) -> String {
        serde_json::json!({
            "thought_process": "[1] compare",
            "response_to_user": format!("I recommend {} at ${} per night, a great value.", name, price),
            "claims": {"city": "Paris", "top_hotels": [{"name": name, "price": price, "rating": 4.5}]}
        })
        .to_string()
    }

    #[test]
    fn test_transitions() {
        use CorrectionState::*;
        assert!(Initial.can_transition_to(Checked));
        assert!(Checked.can_transition_to(NeedsCorrection));
        assert!(!Clean.can_transition_to(Corrected));
        assert!(!Done.can_transition_to(Checked));
        assert!(Corrected.is_terminal());
        assert!(!NeedsCorrection.is_terminal());
    }

    #[tokio::test]
    async fn test_clean_output_unchanged() {
        let provider = MockLlmProvider::new();
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 150.0));
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();
        assert_eq!(outcome.state, CorrectionState::Done);
        assert_eq!(outcome.output, envelope("Grand Hotel Paris", 150.0));
        assert_eq!(provider.call_count(), 0);
        assert!(outcome.report.is_some());
        assert!(outcome.provenance.is_live());
    }

    #[tokio::test]
    async fn test_malformed_output_passes_through() {
        let provider = MockLlmProvider::new();
        let first = MockLlmProvider::text_response("not json at all");
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();
        assert_eq!(outcome.state, CorrectionState::Done);
        assert_eq!(outcome.output, "not json at all");
        assert!(outcome.report.is_none());
        assert_eq!(outcome.display_text(), "not json at all");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_critical_issue_triggers_one_correction() {
        let provider = MockLlmProvider::new();
        provider.queue_response(MockLlmProvider::text_response(&envelope(
            "Grand Hotel Paris",
            150.0,
        )));
        let context = CompletionRequest {
            messages: vec![Message::user("hotels in Paris")],
            ..Default::default()
        };
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 200.0));
        let outcome = orchestrator()
            .run(&provider, &context, &first, &paris())
            .await
            .unwrap();

        assert_eq!(outcome.state, CorrectionState::Corrected);
        assert!(outcome.was_corrected());
        assert!(outcome.residual_issues.is_empty());
        assert_eq!(outcome.usage.total(), 300);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.response_format, ResponseFormat::JsonObject);
        assert!(sent.tools.is_none());
        assert_eq!(sent.messages.len(), 2);
        let directive = sent.messages[1].content.as_text().unwrap();
        assert!(directive.contains("PRICE CONTRADICTION"));
        assert!(directive.contains("200"));
    }

    #[tokio::test]
    async fn test_correction_without_json_mode_sends_text_format() {
        let provider = MockLlmProvider::new().without_json_mode();
        provider.queue_response(MockLlmProvider::text_response(&envelope(
            "Grand Hotel Paris",
            150.0,
        )));
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 200.0));
        orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();
        assert_eq!(provider.requests()[0].response_format, ResponseFormat::Text);
    }

    #[tokio::test]
    async fn test_residual_issues_reported_without_looping() {
        let provider = MockLlmProvider::new();
        provider.queue_response(MockLlmProvider::text_response(&envelope("Fake Hotel", 150.0)));
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 999.0));
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();
        assert_eq!(outcome.state, CorrectionState::Corrected);
        assert_eq!(outcome.residual_issues.len(), 1);
        assert_eq!(provider.call_count(), 1);
        assert!(outcome.display_text().contains("Fake Hotel"));
    }

    #[tokio::test]
    async fn test_correction_error_is_turn_error() {
        let provider = MockLlmProvider::new();
        provider.queue_error(LlmError::Timeout { timeout_secs: 60 });
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 999.0));
        let err = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_malformed_correction_passes_through() {
        let provider = MockLlmProvider::with_response("sorry");
        let first = MockLlmProvider::text_response(&envelope("Grand Hotel Paris", 999.0));
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();
        assert_eq!(outcome.state, CorrectionState::Corrected);
        assert_eq!(outcome.output, "sorry");
        assert!(outcome.residual_issues.is_empty());
    }

    #[tokio::test]
    async fn test_reasoning_steps_array_still_checked() {
        let provider = MockLlmProvider::new();
        provider.queue_response(MockLlmProvider::text_response(&envelope(
            "Grand Hotel Paris",
            150.0,
        )));
        let raw = serde_json::json!({
            "thought_process": ["[1] intent", "[2] data"],
            "response_to_user": "Stay at Fake Hotel Name.",
            "claims": {"city": "Paris", "top_hotels": [{"name": "Fake Hotel Name", "price": 999}]}
        })
        .to_string();
        let first = MockLlmProvider::text_response(&raw);
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();

        assert_eq!(outcome.state, CorrectionState::Corrected);
        assert!(outcome.report.as_ref().unwrap().has_critical_issues());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_null_fields_still_checked() {
        let provider = MockLlmProvider::new();
        let raw = r#"{"thought_process": null, "response_to_user": "Nothing found.", "claims": {"city": "Paris", "top_hotels": null}}"#;
        let first = MockLlmProvider::text_response(raw);
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();

        assert_eq!(outcome.state, CorrectionState::Done);
        assert!(outcome.report.is_some());
        assert!(outcome.reasoning().is_none());
        assert_eq!(outcome.display_text(), "Nothing found.");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invented_hotel_among_junk_entries_is_corrected() {
        let provider = MockLlmProvider::new();
        provider.queue_response(MockLlmProvider::text_response(&envelope(
            "Grand Hotel Paris",
            150.0,
        )));
        let raw = r#"{"thought_process": null, "response_to_user": "Try these.",
            "claims": {"top_hotels": ["Grand Hotel Paris", {"name": "Chateau Imaginaire", "price": 80}]}}"#;
        let first = MockLlmProvider::text_response(raw);
        let outcome = orchestrator()
            .run(&provider, &CompletionRequest::default(), &first, &paris())
            .await
            .unwrap();

        assert_eq!(outcome.state, CorrectionState::Corrected);
        let report = outcome.report.unwrap();
        assert!(report.issues.iter().any(|i| i.message.contains("Chateau Imaginaire")));
    }

    #[test]
    fn test_reasoning_and_display() {
        let outcome = TurnOutcome {
            output: envelope("Grand Hotel Paris", 150.0),
            state: CorrectionState::Done,
            report: None,
            residual_issues: vec![],
            provenance: Provenance::NotQueried,
            usage: TokenUsage::default(),
        };
        assert_eq!(outcome.reasoning().as_deref(), Some("[1] compare"));
        assert!(outcome.display_text().starts_with("I recommend Grand Hotel Paris"));
    }
}
