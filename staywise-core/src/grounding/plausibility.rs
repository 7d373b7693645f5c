//! Plausibility heuristics over claimed prices and ratings.
//!
//! These are fabrication signals rather than contradictions and are never
//! critical.

use super::{Issue, IssueKind, IssueSource};
use crate::config::GroundingConfig;
use crate::model::{Claim, provided};

fn issue(kind: IssueKind, message: String) -> Issue {
    Issue::new(kind, IssueSource::Plausibility, message)
}

fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

pub fn check(claims: &[Claim], config: &GroundingConfig) -> Vec<Issue> {
    let mut issues = Vec::new();

    let prices: Vec<f64> = claims
        .iter()
        .filter_map(|c| provided(c.price.as_ref()).and_then(|p| p.as_number()))
        .collect();
    let ratings: Vec<f64> = claims
        .iter()
        .filter_map(|c| provided(c.rating.as_ref()).and_then(|r| r.as_rating()))
        .collect();

    if !prices.is_empty() {
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if min < config.min_plausible_price {
            issues.push(issue(
                IssueKind::ImplausibleValue,
                format!("very low price claimed ({}); likely unrealistic", min),
            ));
        }
        if max > config.max_plausible_price {
            issues.push(issue(
                IssueKind::ImplausibleValue,
                format!("very high price claimed ({}); likely unrealistic", max),
            ));
        }
        if prices.len() >= config.uniformity_min_count && all_equal(&prices) {
            issues.push(issue(
                IssueKind::SuspiciousUniformity,
                format!("all {} hotels share the same price ({})", prices.len(), prices[0]),
            ));
        }
    }

    if ratings.len() >= config.uniformity_min_count && all_equal(&ratings) {
        issues.push(issue(
            IssueKind::SuspiciousUniformity,
            format!(
                "all {} hotels share the same rating ({})",
                ratings.len(),
                ratings[0]
            ),
        ));
    }

    issues
}
