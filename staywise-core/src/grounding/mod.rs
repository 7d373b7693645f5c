//! Grounding pipeline: hallucination detection over generator claims.
//!
//! Four independent checks run over one turn's [`FactSet`] and [`ClaimSet`]:
//! grounding against the facts, internal consistency, plausibility of the
//! claimed values, and misinformation patterns in the free text. Their issues
//! are merged in that order into a [`ValidationReport`] together with a
//! [`FusionScore`]. None of the checks fail; malformed input degrades to
//! skipped comparisons or to issues.

pub mod consistency;
pub mod fusion;
pub mod patterns;
pub mod plausibility;
pub mod similarity;
pub mod verifier;

pub use fusion::{FusionIssue, FusionIssueKind, FusionScore, Grade, Synthesis};
pub use patterns::{MatchMode, PatternDetector, PatternRule};
pub use similarity::{NameSimilarity, SubstringSimilarity};

use crate::config::GroundingConfig;
use crate::error::ConfigError;
use crate::model::{ClaimSet, FactSet};
use serde::{Deserialize, Serialize};

/// Category of a detected problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    HallucinatedEntity,
    CountMismatch,
    PriceContradiction,
    RatingContradiction,
    MissingName,
    DuplicateEntity,
    InvalidRange,
    ImplausibleValue,
    SuspiciousUniformity,
    UnsupportedOverconfidence,
    UnsupportedSuperlative,
    UnsupportedNumeric,
    InvalidFormat,
}

impl IssueKind {
    /// Critical kinds contradict ground truth and trigger a correction.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            IssueKind::HallucinatedEntity
                | IssueKind::PriceContradiction
                | IssueKind::RatingContradiction
                | IssueKind::CountMismatch
                | IssueKind::InvalidFormat
        )
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IssueKind::HallucinatedEntity => "HALLUCINATED ENTITY",
            IssueKind::CountMismatch => "COUNT MISMATCH",
            IssueKind::PriceContradiction => "PRICE CONTRADICTION",
            IssueKind::RatingContradiction => "RATING CONTRADICTION",
            IssueKind::MissingName => "MISSING NAME",
            IssueKind::DuplicateEntity => "DUPLICATE ENTITY",
            IssueKind::InvalidRange => "INVALID RANGE",
            IssueKind::ImplausibleValue => "IMPLAUSIBLE VALUE",
            IssueKind::SuspiciousUniformity => "SUSPICIOUS UNIFORMITY",
            IssueKind::UnsupportedOverconfidence => "UNSUPPORTED OVERCONFIDENCE",
            IssueKind::UnsupportedSuperlative => "UNSUPPORTED SUPERLATIVE",
            IssueKind::UnsupportedNumeric => "UNSUPPORTED NUMERIC",
            IssueKind::InvalidFormat => "INVALID FORMAT",
        };
        f.write_str(label)
    }
}

/// The check that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    Grounding,
    Consistency,
    Plausibility,
    Misinformation,
}

/// A single detected problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub source: IssueSource,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, source: IssueSource, message: impl Into<String>) -> Self {
        Self {
            kind,
            source,
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Overall confidence in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Low,
}

/// Issue counts per check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_issues: usize,
    pub grounding_issues: usize,
    pub consistency_issues: usize,
    pub plausibility_concerns: usize,
    pub misinformation_patterns: usize,
    pub has_critical_issues: bool,
    pub confidence: Confidence,
}

impl DetectionSummary {
    /// Summarize a merged issue list.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let count = |source: IssueSource| issues.iter().filter(|i| i.source == source).count();
        Self {
            total_issues: issues.len(),
            grounding_issues: count(IssueSource::Grounding),
            consistency_issues: count(IssueSource::Consistency),
            plausibility_concerns: count(IssueSource::Plausibility),
            misinformation_patterns: count(IssueSource::Misinformation),
            has_critical_issues: issues.iter().any(Issue::is_critical),
            confidence: if issues.is_empty() {
                Confidence::High
            } else {
                Confidence::Low
            },
        }
    }
}

/// Everything the pipeline learned about one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub summary: DetectionSummary,
    pub fusion: FusionScore,
}

impl ValidationReport {
    pub fn has_critical_issues(&self) -> bool {
        self.summary.has_critical_issues
    }

    pub fn critical_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_critical())
    }

    /// Messages embedded in a correction directive: detection issues first,
    /// then fusion issues when the fusion check judged the response invalid.
    pub fn directive_messages(&self, limit: usize) -> Vec<String> {
        let fusion = self
            .fusion
            .issues
            .iter()
            .filter(|_| !self.fusion.is_valid)
            .map(|i| i.message.clone());
        self.issues
            .iter()
            .map(|i| i.to_string())
            .chain(fusion)
            .take(limit)
            .collect()
    }
}

/// Runs every check with one configuration.
pub struct GroundingPipeline {
    config: GroundingConfig,
    similarity: Box<dyn NameSimilarity>,
    patterns: PatternDetector,
}

impl std::fmt::Debug for GroundingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundingPipeline")
            .field("config", &self.config)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl GroundingPipeline {
    /// Build a pipeline. Fails only when the configured currency pattern is
    /// not a valid regular expression.
    pub fn new(config: GroundingConfig) -> Result<Self, ConfigError> {
        let patterns = PatternDetector::from_config(&config)?;
        let similarity = Box::new(SubstringSimilarity::new(config.min_fuzzy_name_len));
        Ok(Self {
            config,
            similarity,
            patterns,
        })
    }

    /// Replace the fuzzy name predicate.
    pub fn with_similarity(mut self, similarity: Box<dyn NameSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Replace the misinformation rules.
    pub fn with_patterns(mut self, patterns: PatternDetector) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn config(&self) -> &GroundingConfig {
        &self.config
    }

    /// Grounding check alone. Used for the re-check after a correction.
    pub fn verify(&self, facts: &FactSet, claims: &ClaimSet) -> Vec<Issue> {
        verifier::verify(facts, &claims.claims, &self.config, self.similarity.as_ref())
    }

    /// Run all detection checks and the fusion scorer.
    pub fn check(&self, facts: &FactSet, claims: &ClaimSet) -> ValidationReport {
        let mut issues = self.verify(facts, claims);
        issues.extend(consistency::check(&claims.claims));
        issues.extend(plausibility::check(&claims.claims, &self.config));
        issues.extend(self.patterns.scan(&claims.response_text, facts));

        let summary = DetectionSummary::from_issues(&issues);
        let fusion = fusion::score(facts, claims, &self.config);
        ValidationReport {
            issues,
            summary,
            fusion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Claim, FactRecord};

    fn pipeline() -> GroundingPipeline {
        GroundingPipeline::new(GroundingConfig::default()).unwrap()
    }

    #[test]
    fn test_critical_kinds() {
        assert!(IssueKind::HallucinatedEntity.is_critical());
        assert!(IssueKind::InvalidFormat.is_critical());
        assert!(IssueKind::CountMismatch.is_critical());
        assert!(!IssueKind::MissingName.is_critical());
        assert!(!IssueKind::SuspiciousUniformity.is_critical());
        assert!(!IssueKind::UnsupportedNumeric.is_critical());
    }

    #[test]
    fn test_summary_confidence() {
        let summary = DetectionSummary::from_issues(&[]);
        assert_eq!(summary.confidence, Confidence::High);
        assert!(!summary.has_critical_issues);

        let issues = vec![Issue::new(
            IssueKind::ImplausibleValue,
            IssueSource::Plausibility,
            "cheap",
        )];
        let summary = DetectionSummary::from_issues(&issues);
        assert_eq!(summary.confidence, Confidence::Low);
        assert_eq!(summary.plausibility_concerns, 1);
        assert!(!summary.has_critical_issues);
    }

    #[test]
    fn test_check_orders_issues_by_source() {
        let facts = FactSet::from_records(vec![FactRecord::named("Grand Hotel Paris").with_price(150.0)]);
        let claims = ClaimSet::new(vec![
            Claim::named("Grand Hotel Paris").with_price(5.0),
            Claim::named("grand hotel paris").with_price(5.0),
        ]);
        let report = pipeline().check(&facts, &claims);
        let sources: Vec<IssueSource> = report.issues.iter().map(|i| i.source).collect();
        let mut sorted = sources.clone();
        sorted.sort_by_key(|s| *s as u8);
        assert_eq!(sources, sorted);
        assert!(report.summary.grounding_issues >= 1);
        assert_eq!(report.summary.consistency_issues, 1);
        assert!(report.summary.plausibility_concerns >= 1);
        assert!(report.has_critical_issues());
    }

    #[test]
    fn test_directive_messages_include_invalid_fusion() {
        let facts = FactSet::from_records(vec![FactRecord::named("Grand Hotel Paris")]);
        let claims = ClaimSet::new(vec![Claim::named("Fake Hotel Name")])
            .with_response_text("Stay at Fake Hotel Name.");
        let report = pipeline().check(&facts, &claims);
        assert!(!report.fusion.is_valid);
        let messages = report.directive_messages(10);
        assert!(messages[0].starts_with("HALLUCINATED ENTITY"));
        assert!(messages.len() > report.issues.len());
        assert_eq!(report.directive_messages(1).len(), 1);
    }

    #[test]
    fn test_clean_response() {
        let facts = FactSet::from_records(vec![
            FactRecord::named("Grand Hotel Paris").with_price(150.0).with_rating(4.5),
            FactRecord::named("Hotel Lumiere").with_price(120.0).with_rating(4.1),
        ]);
        let claims = ClaimSet::new(vec![
            Claim::named("Grand Hotel Paris").with_price(150.0).with_rating("4.5 stars"),
            Claim::named("Hotel Lumiere").with_price(120.0).with_rating(4.1),
        ])
        .with_response_text(
            "I recommend Grand Hotel Paris at $150 per night because it has a better rating \
             than Hotel Lumiere, which is a good value option.",
        );
        let report = pipeline().check(&facts, &claims);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert_eq!(report.summary.confidence, Confidence::High);
        assert!(report.fusion.is_valid);
        assert_eq!(report.fusion.grade, Grade::Excellent);
    }
}
