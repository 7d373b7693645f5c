//! Internal consistency of a claim set, independent of the facts.

use super::{Issue, IssueKind, IssueSource};
use crate::model::{Claim, provided};
use std::collections::BTreeMap;

fn issue(kind: IssueKind, message: String) -> Issue {
    Issue::new(kind, IssueSource::Consistency, message)
}

pub fn check(claims: &[Claim]) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for key in claims.iter().filter_map(Claim::name_key) {
        *seen.entry(key).or_default() += 1;
    }
    let duplicates: Vec<&str> = seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(name, _)| name.as_str())
        .collect();
    if !duplicates.is_empty() {
        issues.push(issue(
            IssueKind::DuplicateEntity,
            format!("duplicate hotel entries: {}", duplicates.join(", ")),
        ));
    }

    for (i, claim) in claims.iter().enumerate() {
        if claim.name_key().is_none() {
            issues.push(issue(
                IssueKind::MissingName,
                format!("hotel at index {} is missing its name", i),
            ));
        }
    }

    for claim in claims {
        if let Some(price) = provided(claim.price.as_ref())
            && let Some(value) = price.as_number()
            && value < 0.0
        {
            issues.push(issue(
                IssueKind::InvalidRange,
                format!(
                    "hotel '{}' has a negative price: {}",
                    claim.display_name(),
                    price
                ),
            ));
        }

        if let Some(rating) = provided(claim.rating.as_ref())
            && let Some(value) = rating.as_rating()
            && !(0.0..=5.0).contains(&value)
        {
            issues.push(issue(
                IssueKind::InvalidRange,
                format!(
                    "hotel '{}' has a rating outside 0 to 5: {}",
                    claim.display_name(),
                    rating
                ),
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_duplicates_any_casing() {
        let issues = check(&[
            Claim::named("Grand Hotel"),
            Claim::named("grand HOTEL "),
            Claim::named("Ibis"),
            Claim::named("ibis"),
        ]);
        assert_eq!(kinds(&issues), vec![IssueKind::DuplicateEntity]);
        assert!(issues[0].message.contains("grand hotel, ibis"));
    }

    #[test]
    fn test_distinct_names_clean() {
        assert!(check(&[Claim::named("A"), Claim::named("B")]).is_empty());
    }

    #[test]
    fn test_missing_name_tagged_with_index() {
        let issues = check(&[Claim::named("A"), Claim::default(), Claim::named(" ")]);
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::MissingName, IssueKind::MissingName]
        );
        assert!(issues[0].message.contains("index 1"));
        assert!(issues[1].message.contains("index 2"));
    }

    #[test]
    fn test_ranges() {
        let issues = check(&[
            Claim::named("A").with_price(-5.0),
            Claim::named("B").with_rating("6 stars"),
            Claim::named("C").with_rating(0.0).with_price(0.0),
            Claim::named("D").with_rating("great"),
        ]);
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::InvalidRange, IssueKind::InvalidRange]
        );
        assert!(issues[0].message.contains("'A'"));
        assert!(issues[1].message.contains("'B'"));
    }
}
