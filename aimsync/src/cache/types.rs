//! Cache document types
//!
//! The serialized shape is the persisted cache document and must stay
//! round-trippable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::key::CacheKey;
use crate::product::ProductEnvelope;
use crate::record::SourceRecord;

/// Root cache object: templates keyed by `category|subcategory|brand` plus counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub templates: HashMap<String, Template>,
    pub stats: CacheStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_transformations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Bucket of past examples sharing one cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub category: String,
    pub subcategory: String,
    pub brand: String,
    /// Oldest first; the last element is the most recent
    #[serde(default)]
    pub examples: Vec<Example>,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    pub source_product: CachedSource,
    pub shopify_product: ProductEnvelope,
    pub cached_at: DateTime<Utc>,
}

/// The subset of a source record kept for re-scoring and substitution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedSource {
    #[serde(rename = "Mfg", default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "Model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "Desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Cat Desc", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "Sub Desc", default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

/// Snapshot of cache counters for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsReport {
    pub templates: usize,
    pub total_transformations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits over total transformations, 0.0 when nothing ran yet
    pub hit_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl CachedSource {
    pub fn from_record(record: &SourceRecord) -> Self {
        Self {
            manufacturer: record.manufacturer(),
            model: record.model(),
            description: record.description(),
            category: record.category(),
            subcategory: record.subcategory(),
        }
    }
}

impl CacheStats {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_transformations: 0,
            cache_hits: 0,
            cache_misses: 0,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_transformations == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_transformations as f64
        }
    }
}

impl Template {
    pub fn new(key: &CacheKey, now: DateTime<Utc>) -> Self {
        Self {
            category: key.category.clone(),
            subcategory: key.subcategory.clone(),
            brand: key.brand.clone(),
            examples: Vec::new(),
            created_at: now,
            last_used: now,
        }
    }

    /// Append an example, evicting the oldest beyond `max_examples`.
    pub fn push_example(&mut self, example: Example, max_examples: usize) {
        self.examples.push(example);
        if self.examples.len() > max_examples {
            let overflow = self.examples.len() - max_examples;
            self.examples.drain(..overflow);
        }
    }

    pub fn latest(&self) -> Option<&Example> {
        self.examples.last()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            stats: CacheStats::new(Utc::now()),
        }
    }

    pub fn template(&self, key: &CacheKey) -> Option<&Template> {
        self.templates.get(&key.as_string())
    }

    pub fn record_hit(&mut self) {
        self.stats.cache_hits += 1;
        self.stats.total_transformations += 1;
    }

    pub fn record_miss(&mut self) {
        self.stats.cache_misses += 1;
        self.stats.total_transformations += 1;
    }

    /// Fold a generated product back into the template for `key`, creating the
    /// template if absent.
    pub fn insert_example(
        &mut self,
        key: &CacheKey,
        record: &SourceRecord,
        product: ProductEnvelope,
        max_examples: usize,
    ) {
        let now = Utc::now();
        let template = self
            .templates
            .entry(key.as_string())
            .or_insert_with(|| Template::new(key, now));

        template.push_example(
            Example {
                source_product: CachedSource::from_record(record),
                shopify_product: product,
                cached_at: now,
            },
            max_examples,
        );
        template.last_used = now;
    }

    /// Drop every template and reset the counters.
    pub fn clear(&mut self) {
        self.templates.clear();
        self.stats = CacheStats::new(Utc::now());
    }

    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            templates: self.templates.len(),
            total_transformations: self.stats.total_transformations,
            cache_hits: self.stats.cache_hits,
            cache_misses: self.stats.cache_misses,
            hit_rate: self.stats.hit_rate(),
            created_at: self.stats.created_at,
            last_updated: self.stats.last_updated,
        }
    }
}
