//! Per-record hit/miss decision pipeline

use std::sync::Arc;
use tokio::sync::Mutex;

use super::normalize::normalize_output;
use super::prompt::{build_transform_prompt, TRANSFORM_SYSTEM_PROMPT};
use crate::cache::{apply_template, best_match, Cache, CacheKey, CacheStatsReport, CacheStore};
use crate::config::{CacheConfig, Config};
use crate::generation::{GenerationOptions, TextGenerator};
use crate::mapping::{apply_field_mappings, FieldMapping};
use crate::product::ProductEnvelope;
use crate::record::SourceRecord;
use crate::{Error, Result};

/// Thresholds and limits for the transform pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSettings {
    pub max_examples: usize,
    /// Best-match score at or above which the cache is used
    pub hit_threshold: f64,
    /// Score at or above which a template counts as usable in reports.
    /// Kept separate from `hit_threshold`; it never decides a hit.
    pub usable_threshold: f64,
    pub temperature: f32,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TransformSettings {
    pub fn from_config(config: &Config) -> Self {
        let cache: &CacheConfig = &config.cache;
        Self {
            max_examples: cache.max_examples,
            hit_threshold: cache.hit_threshold,
            usable_threshold: cache.usable_threshold,
            temperature: config.generation.temperature,
        }
    }
}

/// How a product was produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Hit { score: f64 },
    Miss,
}

#[derive(Debug, Clone)]
pub struct Transformed {
    pub product: ProductEnvelope,
    pub key: CacheKey,
    pub outcome: Outcome,
}

/// Owns the transform cache and drives every record through it.
///
/// The cache lock is held for the whole of a transform (lookup, generation,
/// write-back), so concurrent callers are serialized and two misses on the
/// same key can never interleave their appends.
pub struct Transformer {
    store: CacheStore,
    cache: Mutex<Cache>,
    generator: Arc<dyn TextGenerator>,
    settings: TransformSettings,
}

impl Transformer {
    /// Load the persisted cache and build a transformer around it.
    pub async fn open(
        store: CacheStore,
        generator: Arc<dyn TextGenerator>,
        settings: TransformSettings,
    ) -> Result<Self> {
        let cache = store.load().await?;
        tracing::info!(
            "Loaded transform cache from {:?}: {} templates, {} transformations",
            store.path(),
            cache.templates.len(),
            cache.stats.total_transformations
        );
        Ok(Self::with_cache(store, cache, generator, settings))
    }

    pub async fn from_config(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        config.validate()?;
        Self::open(
            CacheStore::new(&config.cache.path),
            generator,
            TransformSettings::from_config(config),
        )
        .await
    }

    pub fn with_cache(
        store: CacheStore,
        cache: Cache,
        generator: Arc<dyn TextGenerator>,
        settings: TransformSettings,
    ) -> Self {
        Self {
            store,
            cache: Mutex::new(cache),
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Transform one record into a draft product.
    pub async fn transform(
        &self,
        record: &SourceRecord,
        mapping: &FieldMapping,
    ) -> Result<ProductEnvelope> {
        Ok(self.transform_with_outcome(record, mapping).await?.product)
    }

    /// Transform one record, also reporting whether the cache was used.
    pub async fn transform_with_outcome(
        &self,
        record: &SourceRecord,
        mapping: &FieldMapping,
    ) -> Result<Transformed> {
        let mapped = apply_field_mappings(record, mapping);
        let key = CacheKey::from_record(record);

        let mut cache = self.cache.lock().await;

        if let Some(template) = CacheStore::lookup(&key, &cache) {
            if let Some(score) = best_match(record, template) {
                if score >= self.settings.hit_threshold {
                    if let Some(product) = apply_template(record, template, &mapped) {
                        cache.record_hit();
                        tracing::debug!(
                            "Cache hit for {} under '{}' (score {:.2})",
                            record.identity(),
                            key,
                            score
                        );
                        return Ok(Transformed {
                            product,
                            key,
                            outcome: Outcome::Hit { score },
                        });
                    }
                }
                tracing::debug!(
                    "Cache miss for {} under '{}' (best score {:.2} < {:.2})",
                    record.identity(),
                    key,
                    score,
                    self.settings.hit_threshold
                );
            } else {
                tracing::debug!("Cache miss for {}: template '{}' has no examples", record.identity(), key);
            }
        } else {
            tracing::debug!("Cache miss for {}: no template for '{}'", record.identity(), key);
        }

        let prompt = build_transform_prompt(record, &mapped, mapping)
            .map_err(|e| Error::transform(record.identity(), e))?;

        let response = self
            .generator
            .generate(
                TRANSFORM_SYSTEM_PROMPT,
                &prompt,
                &GenerationOptions::json(self.settings.temperature),
            )
            .await
            .map_err(|e| Error::transform(record.identity(), format!("generation call failed: {:#}", e)))?;

        let product = normalize_output(&response, record, &mapped)
            .map_err(|e| Error::transform(record.identity(), format!("{:#}", e)))?;

        cache.record_miss();
        cache.insert_example(&key, record, product.clone(), self.settings.max_examples);

        // The in-memory cache keeps the new example even if the write fails;
        // the next successful save brings the document back in line.
        if let Err(e) = self.store.save(&mut cache).await {
            tracing::warn!(
                "Failed to persist transform cache to {:?} after {}: {}",
                self.store.path(),
                record.identity(),
                e
            );
        }

        Ok(Transformed {
            product,
            key,
            outcome: Outcome::Miss,
        })
    }

    /// Whether the record's template scores at or above the usable threshold.
    /// Reporting only; hits are decided by the hit threshold.
    pub async fn has_usable_template(&self, record: &SourceRecord) -> bool {
        let cache = self.cache.lock().await;
        CacheStore::lookup(&CacheKey::from_record(record), &cache)
            .and_then(|template| best_match(record, template))
            .is_some_and(|score| score >= self.settings.usable_threshold)
    }

    pub async fn cache_stats(&self) -> CacheStatsReport {
        self.cache.lock().await.report()
    }

    /// Copy of the current in-memory cache.
    pub async fn snapshot(&self) -> Cache {
        self.cache.lock().await.clone()
    }

    /// Persist the in-memory cache, including counters changed by hits.
    pub async fn flush(&self) -> Result<()> {
        let mut cache = self.cache.lock().await;
        self.store.save(&mut cache).await
    }

    /// Drop all templates, reset the counters and persist the empty cache.
    pub async fn clear_cache(&self) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.clear();
        self.store.save(&mut cache).await?;
        tracing::info!("Cleared transform cache at {:?}", self.store.path());
        Ok(())
    }
}
