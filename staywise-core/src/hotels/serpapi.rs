//! SerpAPI Google Hotels client.

use super::normalize::normalize_response;
use super::{HotelQuery, HotelSource};
use crate::config::FactSourceConfig;
use crate::error::FactSourceError;
use crate::model::FactRecord;
use async_trait::async_trait;
use chrono::{Duration as Days, Local, NaiveDate};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Live hotel data from the `google_hotels` engine.
pub struct SerpApiHotelSource {
    client: Client,
    api_key: String,
    config: FactSourceConfig,
}

impl std::fmt::Debug for SerpApiHotelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiHotelSource")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl SerpApiHotelSource {
    pub fn new(config: &FactSourceConfig, api_key: String) -> Result<Self, FactSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FactSourceError::Request {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            config: config.clone(),
        })
    }

    /// Build from configuration, resolving the key. A missing key is an error
    /// the caller turns into placeholder data.
    pub fn from_config(config: &FactSourceConfig) -> Result<Self, FactSourceError> {
        let key = config
            .resolve_api_key()
            .ok_or_else(|| FactSourceError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(config, key)
    }

    fn map_error(&self, err: reqwest::Error) -> FactSourceError {
        if err.is_timeout() {
            FactSourceError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else if err.is_decode() {
            FactSourceError::Parse {
                message: err.to_string(),
            }
        } else {
            FactSourceError::Request {
                message: err.to_string(),
            }
        }
    }
}

/// Check-in and check-out dates, defaulting to tomorrow and the day after.
pub fn stay_dates(query: &HotelQuery, today: NaiveDate) -> (String, String) {
    let check_in = query
        .check_in
        .clone()
        .unwrap_or_else(|| (today + Days::days(1)).format(DATE_FORMAT).to_string());
    let check_out = query
        .check_out
        .clone()
        .unwrap_or_else(|| (today + Days::days(2)).format(DATE_FORMAT).to_string());
    (check_in, check_out)
}

#[async_trait]
impl HotelSource for SerpApiHotelSource {
    async fn search(&self, query: &HotelQuery) -> Result<Vec<FactRecord>, FactSourceError> {
        let (check_in, check_out) = stay_dates(query, Local::now().date_naive());
        let q = format!("hotels in {}", query.city);
        let adults = self.config.adults.to_string();
        let params = [
            ("engine", "google_hotels"),
            ("q", q.as_str()),
            ("check_in_date", check_in.as_str()),
            ("check_out_date", check_out.as_str()),
            ("adults", adults.as_str()),
            ("currency", self.config.currency.as_str()),
            ("gl", self.config.country.as_str()),
            ("hl", self.config.language.as_str()),
            ("api_key", self.api_key.as_str()),
        ];

        debug!(city = %query.city, %check_in, %check_out, "querying SerpAPI google_hotels");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FactSourceError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| self.map_error(e))?;
        let records = normalize_response(&body, &query.city, self.config.max_results);
        if records.is_empty() {
            return Err(FactSourceError::NoResults {
                location: query.city.clone(),
            });
        }

        info!(city = %query.city, count = records.len(), "hotels found via SerpAPI");
        Ok(records)
    }

    fn name(&self) -> &str {
        "SerpAPI (Google Hotels)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(check_in: Option<&str>, check_out: Option<&str>) -> HotelQuery {
        HotelQuery {
            city: "Paris".into(),
            check_in: check_in.map(String::from),
            check_out: check_out.map(String::from),
        }
    }

    #[test]
    fn test_default_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (check_in, check_out) = stay_dates(&query(None, None), today);
        assert_eq!(check_in, "2025-01-01");
        assert_eq!(check_out, "2025-01-02");
    }

    #[test]
    fn test_explicit_dates_kept() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (check_in, check_out) = stay_dates(&query(Some("2024-07-01"), None), today);
        assert_eq!(check_in, "2024-07-01");
        assert_eq!(check_out, "2024-06-03");
    }

    #[test]
    fn test_from_config_without_key() {
        let config = FactSourceConfig {
            api_key: None,
            api_key_env: "STAYWISE_TEST_NO_SERPAPI_KEY".into(),
            ..FactSourceConfig::default()
        };
        assert!(matches!(
            SerpApiHotelSource::from_config(&config),
            Err(FactSourceError::MissingApiKey { .. })
        ));
    }
}
