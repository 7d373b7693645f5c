//! Fusion quality: does the answer actually blend fact data with reasoning?

use crate::config::GroundingConfig;
use crate::model::{ClaimSet, FactSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const COMPARISON: &[&str] = &["compare", "versus", "vs", "better", "best", "difference"];
const RECOMMENDATION: &[&str] = &["recommend", "suggest", "consider", "prefer", "choose"];
const CONTEXT: &[&str] = &["because", "since", "for", "if you", "depending on"];
const VALUE_ASSESSMENT: &[&str] = &["value", "worth", "excellent", "great", "good", "affordable"];

const VALUE_ADDING: &[&str] = &[
    "recommend", "suggest", "compare", "better", "best", "value", "excellent", "great", "good",
    "option", "choice", "consider",
];
const FACTUAL_MARKERS: &[&str] = &["$", "star", "rating", "night", "hotel"];
const REASONING: &[&str] = &[
    "because", "since", "if", "recommend", "suggest", "consider", "better", "best", "value",
    "excellent", "great",
];

const INVALID_PENALTY: i64 = 30;
const SHALLOW_PENALTY: i64 = 20;
const ISSUE_PENALTY: i64 = 5;

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::Excellent,
            70..=89 => Grade::Good,
            _ => Grade::NeedsImprovement,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::Excellent => write!(f, "Excellent"),
            Grade::Good => write!(f, "Good"),
            Grade::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

/// How much reasoning the response layers on top of the facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Synthesis {
    /// No fact data to synthesize.
    NotApplicable,
    /// No indicator category matched.
    Absent,
    /// Exactly one indicator category matched.
    Basic,
    /// Two or more categories matched.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionIssueKind {
    IgnoredFacts,
    NameMismatch,
    UnmentionedEntities,
    PriceModified,
    ShallowSynthesis,
    MissingFactualMarkers,
    MissingReasoning,
}

impl FusionIssueKind {
    /// Whether this problem makes the fusion invalid, rather than a warning.
    pub fn invalidates(self) -> bool {
        matches!(
            self,
            FusionIssueKind::IgnoredFacts
                | FusionIssueKind::NameMismatch
                | FusionIssueKind::UnmentionedEntities
                | FusionIssueKind::PriceModified
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionIssue {
    pub kind: FusionIssueKind,
    pub message: String,
}

impl FusionIssue {
    fn new(kind: FusionIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionScore {
    pub score: u8,
    pub grade: Grade,
    pub is_valid: bool,
    pub is_meaningful: bool,
    pub synthesis: Synthesis,
    /// Indicator categories found in the response text.
    pub indicators: Vec<String>,
    pub issues: Vec<FusionIssue>,
}

/// Score how well `claims` fuses `facts` into its answer.
pub fn score(facts: &FactSet, claims: &ClaimSet, config: &GroundingConfig) -> FusionScore {
    let text = claims.response_text.to_lowercase();
    let issues = fusion_issues(facts, claims, &text, config);
    let is_valid = !issues.iter().any(|i| i.kind.invalidates());

    let (synthesis, indicators) = synthesis(facts, &text);
    let is_meaningful = synthesis != Synthesis::Absent;

    let mut raw = 100;
    if !is_valid {
        raw -= INVALID_PENALTY;
    }
    if !is_meaningful {
        raw -= SHALLOW_PENALTY;
    }
    raw -= ISSUE_PENALTY * issues.len() as i64;
    let score = raw.clamp(0, 100) as u8;

    FusionScore {
        score,
        grade: Grade::from_score(score),
        is_valid,
        is_meaningful,
        synthesis,
        indicators,
        issues,
    }
}

fn fusion_issues(
    facts: &FactSet,
    claims: &ClaimSet,
    text: &str,
    config: &GroundingConfig,
) -> Vec<FusionIssue> {
    let mut issues = Vec::new();
    if facts.is_empty() {
        return issues;
    }

    let fact_names: HashSet<String> = facts.records.iter().filter_map(|r| r.name_key()).collect();

    if claims.is_empty() {
        issues.push(FusionIssue::new(
            FusionIssueKind::IgnoredFacts,
            "fact source returned hotels but none appear in the claims",
        ));
    } else {
        let claim_names: HashSet<String> =
            claims.claims.iter().filter_map(|c| c.name_key()).collect();
        if fact_names.is_disjoint(&claim_names) {
            issues.push(FusionIssue::new(
                FusionIssueKind::NameMismatch,
                "claimed hotel names share nothing with the fact source names",
            ));
        }
    }

    if !fact_names.iter().any(|n| text.contains(n.as_str())) {
        issues.push(FusionIssue::new(
            FusionIssueKind::UnmentionedEntities,
            "response text mentions none of the fact source hotels",
        ));
    }

    for claim in &claims.claims {
        let Some(key) = claim.name_key() else {
            continue;
        };
        let Some(fact) = facts
            .records
            .iter()
            .find(|r| r.name_key().as_deref() == Some(key.as_str()))
        else {
            continue;
        };
        let claimed = claim.price.as_ref().and_then(|p| p.as_number());
        let actual = fact.price.as_ref().and_then(|p| p.as_number());
        if let (Some(c), Some(a)) = (claimed, actual)
            && (c - a).abs() > config.price_tolerance
        {
            issues.push(FusionIssue::new(
                FusionIssueKind::PriceModified,
                format!(
                    "price for '{}' changed during fusion: fact source {}, response {}",
                    claim.display_name(),
                    a,
                    c
                ),
            ));
        }
    }

    let several = facts.len() > 1;
    if several && !mentions_any(text, VALUE_ADDING) {
        issues.push(FusionIssue::new(
            FusionIssueKind::ShallowSynthesis,
            "response lists hotels without comparing or recommending them",
        ));
    }
    if !mentions_any(text, FACTUAL_MARKERS) {
        issues.push(FusionIssue::new(
            FusionIssueKind::MissingFactualMarkers,
            "response carries no prices, ratings or other fact source details",
        ));
    }
    if several && !mentions_any(text, REASONING) {
        issues.push(FusionIssue::new(
            FusionIssueKind::MissingReasoning,
            "response gives no reasoning or suggestions based on the data",
        ));
    }

    issues
}

fn synthesis(facts: &FactSet, text: &str) -> (Synthesis, Vec<String>) {
    if facts.is_empty() {
        return (Synthesis::NotApplicable, Vec::new());
    }
    let categories = [
        ("comparison", COMPARISON),
        ("recommendation", RECOMMENDATION),
        ("context", CONTEXT),
        ("value_assessment", VALUE_ASSESSMENT),
    ];
    let found: Vec<String> = categories
        .iter()
        .filter(|(_, terms)| mentions_any(text, terms))
        .map(|(name, _)| name.to_string())
        .collect();
    let synthesis = match found.len() {
        0 => Synthesis::Absent,
        1 => Synthesis::Basic,
        _ => Synthesis::Full,
    };
    (synthesis, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Claim, FactRecord};

    fn facts() -> FactSet {
        FactSet::from_records(vec![
            FactRecord::named("Grand Hotel Paris").with_price(150.0),
            FactRecord::named("Hotel Lumiere").with_price(120.0),
        ])
    }

    fn run(facts: &FactSet, claims: &ClaimSet) -> FusionScore {
        score(facts, claims, &GroundingConfig::default())
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(100), Grade::Excellent);
        assert_eq!(Grade::from_score(90), Grade::Excellent);
        assert_eq!(Grade::from_score(89), Grade::Good);
        assert_eq!(Grade::from_score(70), Grade::Good);
        assert_eq!(Grade::from_score(69), Grade::NeedsImprovement);
        assert_eq!(Grade::NeedsImprovement.to_string(), "Needs Improvement");
    }

    #[test]
    fn test_no_facts_is_perfect() {
        let result = run(&FactSet::empty(), &ClaimSet::new(vec![]).with_response_text("Hi"));
        assert_eq!(result.score, 100);
        assert!(result.is_valid && result.is_meaningful);
        assert_eq!(result.synthesis, Synthesis::NotApplicable);
    }

    #[test]
    fn test_ignored_facts() {
        let result = run(&facts(), &ClaimSet::new(vec![]).with_response_text("Nothing found."));
        assert!(!result.is_valid);
        assert!(!result.is_meaningful);
        assert!(result.issues.iter().any(|i| i.kind == FusionIssueKind::IgnoredFacts));
        assert_eq!(result.grade, Grade::NeedsImprovement);
    }

    #[test]
    fn test_price_modified() {
        let claims = ClaimSet::new(vec![Claim::named("Grand Hotel Paris").with_price(199.0)])
            .with_response_text(
                "I recommend Grand Hotel Paris at $199 a night because it is great value.",
            );
        let result = run(&facts(), &claims);
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, FusionIssueKind::PriceModified);
        assert_eq!(result.score, 65);
    }

    #[test]
    fn test_warnings_cost_points_but_keep_validity() {
        let claims = ClaimSet::new(vec![Claim::named("Grand Hotel Paris").with_price(150.0)])
            .with_response_text("grand hotel paris.");
        let result = run(&facts(), &claims);
        assert!(result.is_valid);
        assert!(!result.is_meaningful);
        // shallow synthesis + missing reasoning; "hotel" counts as a factual marker
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.score, 70);
        assert_eq!(result.grade, Grade::Good);
    }

    #[test]
    fn test_basic_and_full_synthesis() {
        let claims = ClaimSet::new(vec![Claim::named("Hotel Lumiere")]);
        let basic = run(
            &facts(),
            &claims.clone().with_response_text("Hotel Lumiere is worth a look."),
        );
        assert_eq!(basic.synthesis, Synthesis::Basic);
        assert_eq!(basic.indicators, vec!["value_assessment"]);

        let full = run(
            &facts(),
            &claims.with_response_text("I recommend Hotel Lumiere, a good value."),
        );
        assert_eq!(full.synthesis, Synthesis::Full);
        assert!(full.is_meaningful);
    }
}
