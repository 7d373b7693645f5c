//! Normalization of Google Hotels (SerpAPI) result records.

use crate::model::{FactRecord, Scalar};
use serde_json::Value;

/// Google Travel search URL for a hotel without a link of its own.
pub fn travel_search_url(name: &str, city: &str) -> String {
    format!(
        "https://www.google.com/travel/hotels?q={}",
        urlencoding::encode(&format!("{} {}", name, city))
    )
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn nested_number(value: &Value, outer: &str, inner: &str) -> Option<f64> {
    value.get(outer)?.get(inner)?.as_f64()
}

/// Price in priority order: nightly rate, total rate, extracted price, then
/// a raw `price` given as a number or a `$`/`,`-decorated string.
pub fn extract_price(record: &Value) -> Option<f64> {
    nested_number(record, "rate_per_night", "extracted_lowest")
        .or_else(|| nested_number(record, "total_rate", "extracted_lowest"))
        .or_else(|| record.get("extracted_price").and_then(Value::as_f64))
        .or_else(|| match record.get("price")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.replace(['$', ','], "").trim().parse::<f64>().ok(),
            _ => None,
        })
}

pub fn extract_address(record: &Value, city: &str) -> String {
    non_empty_str(record, "address")
        .or_else(|| non_empty_str(record, "full_address"))
        .or_else(|| record.get("location").and_then(|l| non_empty_str(l, "address")))
        .or_else(|| non_empty_str(record, "neighborhood"))
        .or_else(|| non_empty_str(record, "district"))
        .unwrap_or(city)
        .to_string()
}

pub fn extract_link(record: &Value, name: &str, city: &str) -> String {
    non_empty_str(record, "link")
        .or_else(|| non_empty_str(record, "website"))
        .or_else(|| non_empty_str(record, "booking_link"))
        .map(str::to_string)
        .unwrap_or_else(|| travel_search_url(name, city))
}

fn extract_rating(record: &Value) -> Option<Scalar> {
    match record.get("overall_rating")? {
        Value::Number(n) => n.as_f64().map(Scalar::Number),
        Value::String(s) => Some(Scalar::Text(s.clone())),
        _ => None,
    }
}

/// `"vacation rental"` becomes `"Vacation Rental"`.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_property(prop: &Value, city: &str) -> Option<FactRecord> {
    let name = non_empty_str(prop, "name")?;
    let category = non_empty_str(prop, "type")
        .map(title_case)
        .unwrap_or_else(|| "Hotel".to_string());
    Some(FactRecord {
        name: Some(name.to_string()),
        price: extract_price(prop).map(Scalar::Number),
        rating: extract_rating(prop),
        address: Some(extract_address(prop, city)),
        review_count: prop.get("reviews").and_then(Value::as_u64),
        link: Some(extract_link(prop, name, city)),
        category: Some(category),
    })
}

fn normalize_ad(ad: &Value, city: &str) -> Option<FactRecord> {
    let name = non_empty_str(ad, "name")?;
    let price = ad.get("extracted_price").and_then(Value::as_f64)?;
    Some(FactRecord {
        name: Some(name.to_string()),
        price: Some(Scalar::Number(price)),
        rating: extract_rating(ad),
        address: Some(extract_address(ad, city)),
        review_count: ad.get("reviews").and_then(Value::as_u64),
        link: Some(extract_link(ad, name, city)),
        category: Some("Hotel".to_string()),
    })
}

/// Extract up to `limit` records: organic `properties` first, then sponsored
/// `ads` that carry a price. Nameless entries are dropped.
pub fn normalize_response(body: &Value, city: &str, limit: usize) -> Vec<FactRecord> {
    let mut records: Vec<FactRecord> = body
        .get("properties")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|p| normalize_property(p, city))
        .take(limit)
        .collect();

    if records.len() < limit
        && let Some(ads) = body.get("ads").and_then(Value::as_array)
    {
        let remaining = limit - records.len();
        records.extend(
            ads.iter()
                .filter_map(|a| normalize_ad(a, city))
                .take(remaining),
        );
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_price_chain() {
        assert_eq!(
            extract_price(&json!({"rate_per_night": {"extracted_lowest": 92}, "total_rate": {"extracted_lowest": 184}})),
            Some(92.0)
        );
        assert_eq!(
            extract_price(&json!({"total_rate": {"extracted_lowest": 184}})),
            Some(184.0)
        );
        assert_eq!(extract_price(&json!({"extracted_price": 75})), Some(75.0));
        assert_eq!(extract_price(&json!({"price": "$1,250"})), Some(1250.0));
        assert_eq!(extract_price(&json!({"price": 99.5})), Some(99.5));
        assert_eq!(extract_price(&json!({"price": "call us"})), None);
        assert_eq!(extract_price(&json!({})), None);
    }

    #[test]
    fn test_address_chain() {
        assert_eq!(extract_address(&json!({"address": "1 Rue"}), "Paris"), "1 Rue");
        assert_eq!(
            extract_address(&json!({"location": {"address": "2 Rue"}}), "Paris"),
            "2 Rue"
        );
        assert_eq!(
            extract_address(&json!({"address": "", "district": "Marais"}), "Paris"),
            "Marais"
        );
        assert_eq!(extract_address(&json!({"location": "x"}), "Paris"), "Paris");
    }

    #[test]
    fn test_link_fallback() {
        assert_eq!(
            extract_link(&json!({"website": "https://h.example"}), "H", "Paris"),
            "https://h.example"
        );
        assert_eq!(
            extract_link(&json!({}), "Hotel Soho", "Barcelona"),
            "https://www.google.com/travel/hotels?q=Hotel%20Soho%20Barcelona"
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("vacation rental"), "Vacation Rental");
        assert_eq!(title_case("HOTEL"), "Hotel");
    }

    #[test]
    fn test_normalize_properties_then_ads() {
        let body = json!({
            "properties": [
                {"name": "Hotel Soho Barcelona", "rate_per_night": {"extracted_lowest": 92},
                 "overall_rating": 4.6, "reviews": 1319, "type": "hotel"},
                {"rate_per_night": {"extracted_lowest": 10}},
                {"name": "Casa Bonay", "overall_rating": "4.4", "type": "boutique hotel"}
            ],
            "ads": [
                {"name": "No Price Inn"},
                {"name": "Ad Hotel", "extracted_price": 140, "overall_rating": 4.0},
                {"name": "Second Ad", "extracted_price": 150}
            ]
        });
        let records = normalize_response(&body, "Barcelona", 3);
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.name.as_deref(), Some("Hotel Soho Barcelona"));
        assert_eq!(first.price, Some(Scalar::Number(92.0)));
        assert_eq!(first.rating, Some(Scalar::Number(4.6)));
        assert_eq!(first.review_count, Some(1319));
        assert_eq!(first.category.as_deref(), Some("Hotel"));
        assert_eq!(first.address.as_deref(), Some("Barcelona"));

        assert_eq!(records[1].name.as_deref(), Some("Casa Bonay"));
        assert_eq!(records[1].price, None);
        assert_eq!(records[1].category.as_deref(), Some("Boutique Hotel"));
        assert_eq!(records[2].name.as_deref(), Some("Ad Hotel"));
        assert_eq!(records[2].category.as_deref(), Some("Hotel"));
    }

    #[test]
    fn test_ads_skipped_when_full() {
        let body = json!({
            "properties": [{"name": "A"}, {"name": "B"}],
            "ads": [{"name": "Ad", "extracted_price": 100}]
        });
        assert_eq!(normalize_response(&body, "X", 2).len(), 2);
        assert_eq!(normalize_response(&body, "X", 5).len(), 3);
    }

    #[test]
    fn test_empty_body() {
        assert!(normalize_response(&json!({"error": "x"}), "X", 5).is_empty());
    }
}
