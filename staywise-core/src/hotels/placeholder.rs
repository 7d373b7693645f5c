//! Deterministic stand-in hotels used when the live source is unavailable.

use super::normalize::travel_search_url;
use crate::model::{FactRecord, Scalar};

/// Base nightly price derived from the city name, between 150 and 340.
pub fn base_price(city: &str) -> f64 {
    let seed = city.chars().map(|c| c as u64).sum::<u64>() % 20;
    150.0 + seed as f64 * 10.0
}

/// Three placeholder hotels synthesized from `city`.
pub fn placeholder_records(city: &str) -> Vec<FactRecord> {
    let base = base_price(city);
    let templates = [
        (format!("The {} Grand Royale", city), 0.0, "4.5", "Luxury", format!("Downtown {}", city), 1200),
        (format!("{} Business Boutique", city), -70.0, "4.2", "Business", format!("City Center, {}", city), 850),
        (format!("{} Comfort Inn", city), -100.0, "4.0", "Mid-range", format!("Near Airport, {}", city), 650),
    ];

    templates
        .into_iter()
        .map(|(name, offset, rating, category, address, reviews)| FactRecord {
            link: Some(travel_search_url(&name, city)),
            name: Some(name),
            price: Some(Scalar::Number(base + offset)),
            rating: Some(Scalar::from(rating)),
            address: Some(address),
            review_count: Some(reviews),
            category: Some(category.to_string()),
        })
        .collect()
}
