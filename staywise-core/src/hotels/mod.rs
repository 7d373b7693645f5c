//! Hotel fact source.
//!
//! A [`HotelSource`] returns normalized [`FactRecord`]s for a city.
//! [`HotelSearch`] wraps one and never fails: any source error is replaced by
//! deterministic placeholder data so that the pipeline always has a fact set
//! to check against.

pub mod normalize;
pub mod placeholder;
pub mod serpapi;

pub use serpapi::SerpApiHotelSource;

use crate::config::FactSourceConfig;
use crate::error::FactSourceError;
use crate::model::{FactRecord, FactSet, Provenance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Arguments of one hotel search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelQuery {
    pub city: String,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
}

impl HotelQuery {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            check_in: None,
            check_out: None,
        }
    }

    /// Read tool-call arguments. Returns `None` unless a non-blank city is given;
    /// blank dates count as absent.
    pub fn from_arguments(args: &serde_json::Value) -> Option<Self> {
        let text = |key: &str| {
            args.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            city: text("city")?,
            check_in: text("check_in"),
            check_out: text("check_out"),
        })
    }
}

/// A provider of hotel records.
#[async_trait]
pub trait HotelSource: Send + Sync {
    /// Search for hotels. An empty result should be reported as
    /// [`FactSourceError::NoResults`].
    async fn search(&self, query: &HotelQuery) -> Result<Vec<FactRecord>, FactSourceError>;

    /// Human-readable source name recorded in the provenance.
    fn name(&self) -> &str;
}

/// Fact search with placeholder fallback.
#[derive(Clone)]
pub struct HotelSearch {
    source: Result<Arc<dyn HotelSource>, String>,
    max_results: usize,
}

impl std::fmt::Debug for HotelSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotelSearch")
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl HotelSearch {
    pub fn new(source: Arc<dyn HotelSource>, max_results: usize) -> Self {
        Self {
            source: Ok(source),
            max_results,
        }
    }

    /// A search that always serves placeholder data, tagged with `reason`.
    pub fn placeholder_only(reason: impl Into<String>, max_results: usize) -> Self {
        Self {
            source: Err(reason.into()),
            max_results,
        }
    }

    /// SerpAPI when a key is configured, placeholder data otherwise.
    pub fn from_config(config: &FactSourceConfig) -> Self {
        match SerpApiHotelSource::from_config(config) {
            Ok(source) => Self::new(Arc::new(source), config.max_results),
            Err(e) => {
                warn!(error = %e, "hotel search will use placeholder data");
                Self::placeholder_only(e.to_string(), config.max_results)
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.source.is_ok()
    }

    /// Search, falling back to placeholder data on any source failure.
    pub async fn search(&self, query: &HotelQuery) -> FactSet {
        let source = match &self.source {
            Ok(source) => source,
            Err(reason) => return self.placeholder(query, reason.clone()),
        };

        match source.search(query).await {
            Ok(records) if records.iter().any(FactRecord::is_valid) => FactSet::new(
                query.city.clone(),
                records,
                Provenance::Live {
                    source: source.name().to_string(),
                },
                self.max_results,
            ),
            Ok(_) => {
                let err = FactSourceError::NoResults {
                    location: query.city.clone(),
                };
                warn!(city = %query.city, "hotel search returned nothing usable; using placeholder data");
                self.placeholder(query, err.to_string())
            }
            Err(e) => {
                warn!(city = %query.city, error = %e, "hotel search failed; using placeholder data");
                self.placeholder(query, e.to_string())
            }
        }
    }

    fn placeholder(&self, query: &HotelQuery, reason: String) -> FactSet {
        FactSet::new(
            query.city.clone(),
            placeholder::placeholder_records(&query.city),
            Provenance::Placeholder { reason },
            self.max_results,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    enum Scripted {
        Records(Vec<FactRecord>),
        TimesOut,
    }

    #[async_trait]
    impl HotelSource for Scripted {
        async fn search(&self, _query: &HotelQuery) -> Result<Vec<FactRecord>, FactSourceError> {
            match self {
                Scripted::Records(records) => Ok(records.clone()),
                Scripted::TimesOut => Err(FactSourceError::Timeout { timeout_secs: 15 }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_query_from_arguments() {
        let q = HotelQuery::from_arguments(&json!({"city": " Paris ", "check_in": "2025-05-01", "check_out": ""}))
            .unwrap();
        assert_eq!(q.city, "Paris");
        assert_eq!(q.check_in.as_deref(), Some("2025-05-01"));
        assert_eq!(q.check_out, None);

        assert!(HotelQuery::from_arguments(&json!({})).is_none());
        assert!(HotelQuery::from_arguments(&json!({"city": "  "})).is_none());
        assert!(HotelQuery::from_arguments(&json!({"city": 42})).is_none());
    }

    #[tokio::test]
    async fn test_live_results_capped() {
        let records = (0..8).map(|i| FactRecord::named(format!("Hotel {}", i))).collect();
        let search = HotelSearch::new(Arc::new(Scripted::Records(records)), 5);
        let facts = search.search(&HotelQuery::new("Paris")).await;
        assert_eq!(facts.len(), 5);
        assert!(facts.provenance.is_live());
        assert_eq!(facts.location, "Paris");
    }

    #[tokio::test]
    async fn test_error_falls_back_to_placeholder() {
        let search = HotelSearch::new(Arc::new(Scripted::TimesOut), 5);
        let facts = search.search(&HotelQuery::new("Rome")).await;
        assert_eq!(facts.len(), 3);
        assert_eq!(facts.records[0].name.as_deref(), Some("The Rome Grand Royale"));
        match &facts.provenance {
            Provenance::Placeholder { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected placeholder, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_or_nameless_results_fall_back() {
        let search = HotelSearch::new(Arc::new(Scripted::Records(vec![FactRecord::default()])), 5);
        let facts = search.search(&HotelQuery::new("Oslo")).await;
        assert!(!facts.provenance.is_live());
        assert_eq!(facts.len(), 3);
    }

    #[tokio::test]
    async fn test_placeholder_only_respects_cap() {
        let search = HotelSearch::placeholder_only("no key", 2);
        let facts = search.search(&HotelQuery::new("Lima")).await;
        assert_eq!(facts.len(), 2);
        assert!(!search.is_live());
    }
}
