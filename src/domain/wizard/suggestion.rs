//! Suggestion engine - ranks replacement offers for an expired item.
//!
//! Each candidate gets four component scores in `[0, 1]`:
//!
//! | Component | 1.0 when                         | Otherwise                        |
//! |-----------|----------------------------------|----------------------------------|
//! | brand     | same brand (case-insensitive)    | 0.5 if unknown, else 0.0         |
//! | store     | same store as the expired offer  | 0.6                              |
//! | size      | same normalized package size     | min/max ratio, 0.5 if unparseable|
//! | price     | cheaper or equal                 | linear decay to 0 at +50%        |
//!
//! `total` is the weighted sum and is what orders suggestions. How similar
//! the candidate product is to the expired one comes from the offer catalog
//! and only feeds `confidence`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::expired_item::{ExpiredItem, StoreRef};
use crate::domain::foundation::{OfferId, Timestamp};

const BRAND_WEIGHT: f64 = 0.30;
const STORE_WEIGHT: f64 = 0.15;
const SIZE_WEIGHT: f64 = 0.20;
const PRICE_WEIGHT: f64 = 0.35;

/// Price increase (as a fraction of the original) at which the price score reaches zero.
const PRICE_ZERO_AT: f64 = 0.5;

/// Share of `confidence` taken from the composite score; the rest is product similarity.
const CONFIDENCE_SCORE_SHARE: f64 = 0.6;

/// A replacement offer as delivered by the offer catalog, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOffer {
    pub offer_id: OfferId,
    pub store: StoreRef,
    pub product_name: String,
    pub brand: Option<String>,
    pub price: Decimal,
    pub size: Option<String>,
    pub valid_until: Timestamp,
    /// Product similarity to the expired item in `[0, 1]`, computed by the catalog.
    pub similarity: f64,
}

/// Per-component scores; `total` is the weighted composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub brand: f64,
    pub store: f64,
    pub size: f64,
    pub price: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    fn from_components(brand: f64, store: f64, size: f64, price: f64) -> Self {
        let total = BRAND_WEIGHT * brand
            + STORE_WEIGHT * store
            + SIZE_WEIGHT * size
            + PRICE_WEIGHT * price;
        Self {
            brand,
            store,
            size,
            price,
            total: round4(total.clamp(0.0, 1.0)),
        }
    }
}

/// Fields on which the candidate fully matches the expired item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Brand,
    Store,
    Size,
    Price,
}

/// A scored candidate replacement offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub offer_id: OfferId,
    pub store: StoreRef,
    pub product_name: String,
    pub brand: Option<String>,
    /// Unit price of the replacement offer.
    pub price: Decimal,
    pub valid_until: Timestamp,
    /// Composite score in `[0, 1]`, equal to `breakdown.total`.
    pub score: f64,
    pub confidence: f64,
    pub explanation: String,
    pub matched_fields: Vec<MatchedField>,
    /// Replacement unit price minus original unit price; negative means cheaper.
    pub price_difference: Decimal,
    pub size_comparison: Option<String>,
    pub breakdown: ScoreBreakdown,
}

/// Ranks catalog candidates into suggestions for one expired item.
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    max_suggestions: usize,
    min_similarity: f64,
}

impl SuggestionEngine {
    pub fn new(max_suggestions: usize, min_similarity: f64) -> Self {
        Self {
            max_suggestions,
            min_similarity: min_similarity.clamp(0.0, 1.0),
        }
    }

    /// Scores, filters and orders candidates best-first.
    ///
    /// The item's own expired offer and candidates below the similarity
    /// floor are dropped; at most `max_suggestions` are returned.
    pub fn suggest(&self, item: &ExpiredItem, candidates: Vec<CandidateOffer>) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = candidates
            .into_iter()
            .filter(|c| Some(c.offer_id) != item.original_offer_id)
            .filter(|c| c.similarity >= self.min_similarity)
            .map(|c| self.score(item, c))
            .collect();

        suggestions.sort_by(compare_suggestions);
        suggestions.dedup_by_key(|s| s.offer_id);
        suggestions.truncate(self.max_suggestions);
        suggestions
    }

    /// Scores a single candidate against the expired item.
    pub fn score(&self, item: &ExpiredItem, candidate: CandidateOffer) -> Suggestion {
        let brand = brand_score(item.brand.as_deref(), candidate.brand.as_deref());
        let store = if candidate.store.id == item.original_store.id {
            1.0
        } else {
            0.6
        };
        let size_cmp = compare_sizes(item.size.as_deref(), candidate.size.as_deref());
        let size = size_cmp.as_ref().map_or(0.5, |c| c.score);
        let price = price_score(item.original_price, candidate.price);

        let breakdown = ScoreBreakdown::from_components(brand, store, size, price);
        let similarity = candidate.similarity.clamp(0.0, 1.0);
        let confidence = round4(
            CONFIDENCE_SCORE_SHARE * breakdown.total + (1.0 - CONFIDENCE_SCORE_SHARE) * similarity,
        );

        let mut matched_fields = Vec::new();
        for (field, value) in [
            (MatchedField::Brand, brand),
            (MatchedField::Store, store),
            (MatchedField::Size, size),
            (MatchedField::Price, price),
        ] {
            if value >= 0.999 {
                matched_fields.push(field);
            }
        }

        let price_difference = (candidate.price - item.original_price).round_dp(2);
        let size_comparison = size_cmp.map(|c| c.description);
        let explanation = explain(
            brand,
            &candidate,
            item,
            price_difference,
            size_comparison.as_deref(),
        );

        Suggestion {
            offer_id: candidate.offer_id,
            store: candidate.store,
            product_name: candidate.product_name,
            brand: candidate.brand,
            price: candidate.price,
            valid_until: candidate.valid_until,
            score: breakdown.total,
            confidence,
            explanation,
            matched_fields,
            price_difference,
            size_comparison,
            breakdown,
        }
    }
}

/// Best-first ordering: score desc, then cheaper, then lower offer id.
fn compare_suggestions(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.price.cmp(&b.price))
        .then_with(|| a.offer_id.cmp(&b.offer_id))
}

fn brand_score(original: Option<&str>, candidate: Option<&str>) -> f64 {
    match (original, candidate) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            if a.trim().eq_ignore_ascii_case(b.trim()) {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.5,
    }
}

fn price_score(original: Decimal, candidate: Decimal) -> f64 {
    if original <= Decimal::ZERO {
        return 0.5;
    }
    let increase = ((candidate - original) / original).to_f64().unwrap_or(0.0);
    if increase <= 0.0 {
        1.0
    } else {
        round4((1.0 - increase / PRICE_ZERO_AT).max(0.0))
    }
}

fn explain(
    brand: f64,
    candidate: &CandidateOffer,
    item: &ExpiredItem,
    price_difference: Decimal,
    size_comparison: Option<&str>,
) -> String {
    let mut parts = Vec::new();

    if brand >= 0.999 {
        parts.push("same brand".to_string());
    } else if let Some(b) = candidate.brand.as_deref().filter(|_| brand == 0.0) {
        parts.push(format!("different brand ({})", b));
    }

    if candidate.store.id == item.original_store.id {
        parts.push(format!("same store ({})", candidate.store.name));
    } else {
        parts.push(format!("available at {}", candidate.store.name));
    }

    match price_difference.cmp(&Decimal::ZERO) {
        Ordering::Less => parts.push(format!("{} cheaper", price_difference.abs())),
        Ordering::Greater => parts.push(format!("{} more expensive", price_difference)),
        Ordering::Equal => parts.push("same price".to_string()),
    }

    if let Some(size) = size_comparison {
        parts.push(size.to_string());
    }

    let text = parts.join(", ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Package sizes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseUnit {
    Gram,
    Millilitre,
    Piece,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PackageSize {
    amount: f64,
    unit: BaseUnit,
}

struct SizeComparison {
    score: f64,
    description: String,
}

/// Parses sizes like "500 g", "1,5kg", "6 x 330 ml" or "10 pcs".
fn parse_size(raw: &str) -> Option<PackageSize> {
    let compact: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let (multiplier, rest) = match compact.split_once(|c| c == 'x' || c == '*') {
        Some((count, rest)) if !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()) => {
            (count.parse::<f64>().ok()?, rest.to_string())
        }
        _ => (1.0, compact.clone()),
    };

    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, unit) = rest.split_at(split);
    let number: f64 = number.parse().ok()?;

    let (factor, unit) = match unit {
        "g" | "gr" => (1.0, BaseUnit::Gram),
        "kg" => (1000.0, BaseUnit::Gram),
        "mg" => (0.001, BaseUnit::Gram),
        "ml" => (1.0, BaseUnit::Millilitre),
        "cl" => (10.0, BaseUnit::Millilitre),
        "dl" => (100.0, BaseUnit::Millilitre),
        "l" => (1000.0, BaseUnit::Millilitre),
        "pc" | "pcs" | "st" | "stk" | "count" | "" => (1.0, BaseUnit::Piece),
        _ => return None,
    };

    let amount = multiplier * number * factor;
    (amount > 0.0).then_some(PackageSize { amount, unit })
}

fn compare_sizes(original: Option<&str>, candidate: Option<&str>) -> Option<SizeComparison> {
    let original = parse_size(original?)?;
    let candidate = parse_size(candidate?)?;

    if original.unit != candidate.unit {
        return Some(SizeComparison {
            score: 0.2,
            description: "different unit".to_string(),
        });
    }

    let ratio = candidate.amount / original.amount;
    let score = round4(original.amount.min(candidate.amount) / original.amount.max(candidate.amount));
    let percent = ((ratio - 1.0).abs() * 100.0).round();
    let description = if percent < 1.0 {
        "same size".to_string()
    } else if ratio > 1.0 {
        format!("{}% larger", percent)
    } else {
        format!("{}% smaller", percent)
    };

    Some(SizeComparison { score, description })
}
