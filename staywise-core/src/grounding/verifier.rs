//! Grounding verifier: compares claims against the fact records.
//!
//! Only contradictions are reported. A field missing on either side is never
//! an issue.

use super::similarity::NameSimilarity;
use super::{Issue, IssueKind, IssueSource};
use crate::config::GroundingConfig;
use crate::model::{Claim, FactRecord, FactSet, provided};
use tracing::debug;

fn issue(kind: IssueKind, message: String) -> Issue {
    Issue::new(kind, IssueSource::Grounding, message)
}

/// Check every claim against `facts`.
pub fn verify(
    facts: &FactSet,
    claims: &[Claim],
    config: &GroundingConfig,
    similarity: &dyn NameSimilarity,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    if facts.is_empty() {
        if !claims.is_empty() {
            issues.push(issue(
                IssueKind::HallucinatedEntity,
                format!(
                    "{} hotel(s) claimed but the fact source returned no results; \
                     the entities were invented",
                    claims.len()
                ),
            ));
        }
        return issues;
    }

    if claims.len() > facts.len() {
        issues.push(issue(
            IssueKind::CountMismatch,
            format!(
                "{} hotels claimed but the fact source returned only {}",
                claims.len(),
                facts.len()
            ),
        ));
    }

    // Ordered, first record wins for duplicate names.
    let mut index: Vec<(String, &FactRecord)> = Vec::with_capacity(facts.len());
    for record in &facts.records {
        if let Some(key) = record.name_key()
            && !index.iter().any(|(k, _)| *k == key)
        {
            index.push((key, record));
        }
    }

    for claim in claims {
        let Some(key) = claim.name_key() else {
            issues.push(issue(
                IssueKind::MissingName,
                "a hotel was claimed without a name".to_string(),
            ));
            continue;
        };

        let matched = index
            .iter()
            .find(|(k, _)| *k == key)
            .or_else(|| index.iter().find(|(k, _)| similarity.is_similar(&key, k)))
            .map(|(_, record)| *record);

        let Some(fact) = matched else {
            let samples: Vec<&str> = facts.names().take(config.max_sample_names).collect();
            issues.push(issue(
                IssueKind::HallucinatedEntity,
                format!(
                    "'{}' is not among the fact source results (available: {})",
                    claim.display_name().trim(),
                    samples.join(", ")
                ),
            ));
            continue;
        };

        debug!(claim = %key, fact = ?fact.name, "claim matched fact record");
        issues.extend(check_price(claim, fact, config));
        issues.extend(check_rating(claim, fact, config));
    }

    issues
}

fn check_price(claim: &Claim, fact: &FactRecord, config: &GroundingConfig) -> Option<Issue> {
    let claimed = provided(claim.price.as_ref())?;
    let actual = provided(fact.price.as_ref())?;
    let name = claim.display_name().trim();

    match (claimed.as_number(), actual.as_number()) {
        (Some(c), Some(a)) => {
            let diff = (c - a).abs();
            (diff > config.price_tolerance).then(|| {
                issue(
                    IssueKind::PriceContradiction,
                    format!(
                        "price for '{}' is {} but the fact source says {} (difference {:.2})",
                        name, claimed, actual, diff
                    ),
                )
            })
        }
        _ => Some(issue(
            IssueKind::InvalidFormat,
            format!(
                "price for '{}' cannot be compared: claimed {}, fact source {}",
                name, claimed, actual
            ),
        )),
    }
}

fn check_rating(claim: &Claim, fact: &FactRecord, config: &GroundingConfig) -> Option<Issue> {
    let claimed = provided(claim.rating.as_ref())?;
    let actual = provided(fact.rating.as_ref())?;
    let diff = (claimed.as_rating()? - actual.as_rating()?).abs();

    (diff > config.rating_tolerance).then(|| {
        issue(
            IssueKind::RatingContradiction,
            format!(
                "rating for '{}' is {} but the fact source says {} (difference {:.2})",
                claim.display_name().trim(),
                claimed,
                actual,
                diff
            ),
        )
    })
}
