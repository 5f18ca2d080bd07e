//! Similarity scoring between a record and cached examples
//!
//! Each factor is a case-insensitive exact comparison contributing its full
//! weight or nothing. A field missing on both sides compares as `"" == ""`
//! and therefore counts as a match.

use super::types::{CachedSource, Template};
use crate::record::SourceRecord;

pub const CATEGORY_WEIGHT: f64 = 0.4;
pub const SUBCATEGORY_WEIGHT: f64 = 0.3;
pub const BRAND_WEIGHT: f64 = 0.3;

fn same(a: Option<&str>, b: Option<&str>) -> bool {
    let a = a.unwrap_or_default().trim().to_lowercase();
    let b = b.unwrap_or_default().trim().to_lowercase();
    a == b
}

/// Score in [0, 1] between a candidate record and one cached example.
pub fn score(candidate: &SourceRecord, example: &CachedSource) -> f64 {
    let mut total = 0.0;
    if same(candidate.category().as_deref(), example.category.as_deref()) {
        total += CATEGORY_WEIGHT;
    }
    if same(candidate.subcategory().as_deref(), example.subcategory.as_deref()) {
        total += SUBCATEGORY_WEIGHT;
    }
    if same(candidate.manufacturer().as_deref(), example.manufacturer.as_deref()) {
        total += BRAND_WEIGHT;
    }
    total
}

/// Highest score over the template's examples; `None` when it has none.
pub fn best_match(candidate: &SourceRecord, template: &Template) -> Option<f64> {
    template
        .examples
        .iter()
        .map(|e| score(candidate, &e.source_product))
        .fold(None, |best, s| match best {
            Some(b) if b >= s => Some(b),
            _ => Some(s),
        })
}
