//! Data model shared by the fact source and the grounding pipeline.
//!
//! [`FactRecord`]s come from the hotel fact source and are trusted.
//! [`Claim`]s come from the generator and are not: they carry the same field
//! set but any value may be fabricated. Numeric fields are kept as
//! [`Scalar`]s so that "present but malformed" stays distinguishable from
//! "absent" all the way into the checks.

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

/// Maximum number of fact records kept per request.
pub const MAX_FACTS: usize = 5;

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?(?:\d+(?:\.\d+)?|\.\d+)").expect("valid numeric regex"));

static STAR_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)stars?").expect("valid unit regex"));

/// A loosely-typed numeric field: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Strict numeric reading: numbers as-is, strings only when the whole
    /// trimmed string parses as a float.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Rating reading: strips "star"/"stars" unit words and takes the first
    /// numeric token, so `"4.5 stars"` and `4.5` compare equal.
    pub fn as_rating(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => {
                let stripped = STAR_UNIT.replace_all(s, "");
                NUMERIC_TOKEN
                    .find(&stripped)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
            }
        }
    }

    /// A blank string counts as "no value provided".
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Filter out blank scalars so that callers only see provided values.
pub(crate) fn provided(value: Option<&Scalar>) -> Option<&Scalar> {
    value.filter(|v| !v.is_blank())
}

/// Case-folded, trimmed name used as the identity key.
pub(crate) fn name_key(name: Option<&str>) -> Option<String> {
    name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty())
}

fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(Scalar::Number),
        Some(serde_json::Value::String(s)) => Some(Scalar::Text(s)),
        // Booleans, arrays and objects are kept as text so the checks can
        // report them as malformed instead of silently dropping them.
        Some(other) => Some(Scalar::Text(other.to_string())),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.replace(',', "").trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// Free text from the generator. Arrays (numbered reasoning steps) are joined
/// one item per line; `null` is empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    fn text(value: serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(text)
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => text(other).unwrap_or_default(),
        None => String::new(),
    })
}

/// Anything other than an object reads as an empty payload.
fn lenient_payload<'de, D>(deserializer: D) -> Result<ClaimsPayload, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value(value).map_err(D::Error::custom)
        }
        _ => Ok(ClaimsPayload::default()),
    }
}

/// Keeps the object entries of the hotel list and skips the rest. A single
/// object counts as a one-entry list.
fn lenient_claims<'de, D>(deserializer: D) -> Result<Vec<Claim>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items,
        Some(value @ serde_json::Value::Object(_)) => vec![value],
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// One real-world hotel as reported by the fact source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub price: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub rating: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(
        rename = "reviews",
        alias = "reviewCount",
        default,
        deserialize_with = "lenient_count"
    )]
    pub review_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
}

impl FactRecord {
    /// Create a record with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: impl Into<Scalar>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<Scalar>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    /// Whether the record may take part in grounding comparisons.
    pub fn is_valid(&self) -> bool {
        self.name_key().is_some()
    }

    pub fn name_key(&self) -> Option<String> {
        name_key(self.name.as_deref())
    }
}

/// The generator's assertion about one hotel. Untrusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub price: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_scalar")]
    pub rating: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(
        rename = "reviews",
        alias = "reviewCount",
        default,
        deserialize_with = "lenient_count"
    )]
    pub review_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
}

impl Claim {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: impl Into<Scalar>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<Scalar>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn name_key(&self) -> Option<String> {
        name_key(self.name.as_deref())
    }

    /// Display name for messages; blank names render as an empty string.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Where a [`FactSet`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Live results from the provider.
    Live { source: String },
    /// Deterministic stand-in data synthesized from the location.
    Placeholder { reason: String },
    /// The turn never queried the fact source.
    NotQueried,
}

impl Provenance {
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::Live { .. })
    }
}

/// The ground truth for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSet {
    pub location: String,
    pub records: Vec<FactRecord>,
    pub provenance: Provenance,
}

impl FactSet {
    /// Build a fact set, dropping nameless records and capping at `limit`.
    pub fn new(
        location: impl Into<String>,
        records: Vec<FactRecord>,
        provenance: Provenance,
        limit: usize,
    ) -> Self {
        let records = records
            .into_iter()
            .filter(FactRecord::is_valid)
            .take(limit.min(MAX_FACTS))
            .collect();
        Self {
            location: location.into(),
            records,
            provenance,
        }
    }

    /// An empty fact set for turns that never queried the fact source.
    pub fn empty() -> Self {
        Self {
            location: String::new(),
            records: Vec::new(),
            provenance: Provenance::NotQueried,
        }
    }

    /// Shorthand used heavily by tests and the offline checker.
    pub fn from_records(records: Vec<FactRecord>) -> Self {
        Self::new("", records, Provenance::NotQueried, MAX_FACTS)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Names of every record, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| r.name.as_deref())
    }
}

/// The generator's structured output for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    pub city: Option<String>,
    pub claims: Vec<Claim>,
    pub response_text: String,
    pub reasoning_trace: String,
}

impl ClaimSet {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self {
            claims,
            ..Default::default()
        }
    }

    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = text.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Parse the generator's JSON envelope. See [`ResponseEnvelope::parse`].
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        ResponseEnvelope::parse(raw).map(Self::from)
    }
}

/// Wire shape of the generator's JSON-mode response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "lenient_string")]
    pub thought_process: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub response_to_user: String,
    #[serde(default, deserialize_with = "lenient_payload")]
    pub claims: ClaimsPayload,
}

impl ResponseEnvelope {
    /// Parse raw generator output.
    ///
    /// Any JSON object is accepted: unknown fields are ignored, and missing,
    /// `null` or oddly typed fields default. Only text that is not a JSON
    /// object is an error, which callers treat as "pass the raw text through".
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("response envelope must be a JSON object"));
        }
        serde_json::from_value(value)
    }
}

/// The `claims` object of the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimsPayload {
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, alias = "hotels", deserialize_with = "lenient_claims")]
    pub top_hotels: Vec<Claim>,
}

impl From<ResponseEnvelope> for ClaimSet {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self {
            city: envelope.claims.city,
            claims: envelope.claims.top_hotels,
            response_text: envelope.response_to_user,
            reasoning_trace: envelope.thought_process,
        }
    }
}
