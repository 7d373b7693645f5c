//! Misinformation pattern detector for responses with nothing to ground on.
//!
//! Rules are an ordered list of case-insensitive regular expressions, each
//! mapped to an [`IssueKind`]. The detector only runs when the fact set is
//! empty.

use super::{Issue, IssueKind, IssueSource};
use crate::config::GroundingConfig;
use crate::error::ConfigError;
use crate::model::FactSet;
use regex::{Regex, RegexBuilder};

/// How many matches a rule reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Report the leftmost match only.
    First,
    /// Report every match, listed in one issue.
    All,
}

/// One pattern mapped to the issue kind it raises.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub kind: IssueKind,
    pub pattern: Regex,
    pub mode: MatchMode,
}

impl PatternRule {
    /// Build a rule from a regular expression, matched case-insensitively.
    pub fn new(kind: IssueKind, pattern: &str, mode: MatchMode) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("invalid pattern for {}: {}", kind, e),
            })?;
        Ok(Self {
            kind,
            pattern,
            mode,
        })
    }

    /// Build a rule matching any of the literal `terms`.
    ///
    /// Returns `None` for an empty lexicon.
    pub fn from_terms(
        kind: IssueKind,
        terms: &[String],
        mode: MatchMode,
    ) -> Result<Option<Self>, ConfigError> {
        let alternatives: Vec<String> = terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        Self::new(kind, &format!("(?:{})", alternatives.join("|")), mode).map(Some)
    }

    fn apply(&self, text: &str) -> Option<Issue> {
        let message = match self.mode {
            MatchMode::First => {
                let found = self.pattern.find(text)?;
                format!(
                    "'{}' used without fact source data to support it",
                    found.as_str()
                )
            }
            MatchMode::All => {
                let found: Vec<&str> = self.pattern.find_iter(text).map(|m| m.as_str()).collect();
                if found.is_empty() {
                    return None;
                }
                format!(
                    "specific amounts mentioned ({}) without fact source data",
                    found.join(", ")
                )
            }
        };
        Some(Issue::new(self.kind, IssueSource::Misinformation, message))
    }
}

/// Ordered rule set.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    rules: Vec<PatternRule>,
}

impl PatternDetector {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// Overconfidence, then superlatives, then currency amounts.
    pub fn from_config(config: &GroundingConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        rules.extend(PatternRule::from_terms(
            IssueKind::UnsupportedOverconfidence,
            &config.overconfidence_terms,
            MatchMode::First,
        )?);
        rules.extend(PatternRule::from_terms(
            IssueKind::UnsupportedSuperlative,
            &config.superlative_terms,
            MatchMode::First,
        )?);
        rules.push(PatternRule::new(
            IssueKind::UnsupportedNumeric,
            &config.currency_pattern,
            MatchMode::All,
        )?);
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Scan `text`. Does nothing when `facts` has records.
    pub fn scan(&self, text: &str, facts: &FactSet) -> Vec<Issue> {
        if !facts.is_empty() || text.trim().is_empty() {
            return Vec::new();
        }
        self.rules.iter().filter_map(|r| r.apply(text)).collect()
    }
}
