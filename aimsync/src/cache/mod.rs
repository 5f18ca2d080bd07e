//! Transform cache
//!
//! Past (source record, generated product) pairs bucketed by a
//! category/subcategory/brand key. A new record whose best similarity
//! against its bucket clears the hit threshold is built from the most recent
//! cached example instead of calling the generator.

mod applicator;
mod key;
mod similarity;
mod store;
mod types;

pub use applicator::apply_template;
pub use key::CacheKey;
pub use similarity::{
    best_match, score, BRAND_WEIGHT, CATEGORY_WEIGHT, SUBCATEGORY_WEIGHT,
};
pub use store::CacheStore;
pub use types::{Cache, CacheStats, CacheStatsReport, CachedSource, Example, Template};
