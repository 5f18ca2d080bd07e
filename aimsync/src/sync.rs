//! Batch sync of inventory records into draft products
//!
//! Drives a batch through the transformer one record at a time, skipping SKUs
//! the store already lists. A failure on one record is recorded and the batch
//! moves on.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

use crate::mapping::FieldMappingResolver;
use crate::product::ProductEnvelope;
use crate::record::SourceRecord;
use crate::transform::{Outcome, Transformer};
use crate::{Error, Result};

/// The commerce platform side of a sync
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// SKUs already present in the store
    async fn existing_skus(&self) -> anyhow::Result<HashSet<String>>;

    /// Create a draft product and return its id
    async fn create_product(&self, product: &ProductEnvelope) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Stop after this many records have been transformed
    pub limit: Option<usize>,
    /// Transform without creating products
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedProduct {
    pub source_id: String,
    /// `None` on dry runs
    pub product_id: Option<String>,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecord {
    pub source_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub created: Vec<CreatedProduct>,
    /// SKUs the catalog already lists
    pub skipped_existing: Vec<String>,
    /// Records repeating a SKU seen earlier in the same batch
    pub skipped_duplicate: Vec<String>,
    pub failed: Vec<FailedRecord>,
    /// Records whose template was usable before they were transformed
    pub with_usable_template: usize,
}

impl SyncReport {
    pub fn cache_hits(&self) -> usize {
        self.created.iter().filter(|c| c.cache_hit).count()
    }
}

pub struct BatchSync<'a> {
    resolver: &'a FieldMappingResolver,
    transformer: &'a Transformer,
    catalog: &'a dyn ProductCatalog,
}

impl<'a> BatchSync<'a> {
    pub fn new(
        resolver: &'a FieldMappingResolver,
        transformer: &'a Transformer,
        catalog: &'a dyn ProductCatalog,
    ) -> Self {
        Self {
            resolver,
            transformer,
            catalog,
        }
    }

    /// Run the batch. Only mapping resolution and the existing-SKU query
    /// abort it; everything else is recorded per record.
    pub async fn run(&self, records: &[SourceRecord], options: &SyncOptions) -> Result<SyncReport> {
        let mapping = self.resolver.resolve().await?;

        let existing = self
            .catalog
            .existing_skus()
            .await
            .map_err(|e| Error::Catalog(format!("Failed to list existing products: {:#}", e)))?;
        tracing::info!(
            "Syncing {} records ({} SKUs already listed{})",
            records.len(),
            existing.len(),
            if options.dry_run { ", dry run" } else { "" }
        );

        let mut report = SyncReport::default();
        let mut in_batch = HashSet::new();
        let mut attempted = 0usize;

        for record in records {
            if options.limit.is_some_and(|limit| attempted >= limit) {
                break;
            }

            let source_id = record.identity();
            if let Some(sku) = record.sku() {
                if existing.contains(&sku) {
                    tracing::debug!("Skipping {}: SKU already listed", source_id);
                    report.skipped_existing.push(source_id);
                    continue;
                }
                if !in_batch.insert(sku) {
                    tracing::debug!("Skipping {}: SKU repeated in batch", source_id);
                    report.skipped_duplicate.push(source_id);
                    continue;
                }
            }

            attempted += 1;
            if self.transformer.has_usable_template(record).await {
                report.with_usable_template += 1;
            }

            let transformed = match self.transformer.transform_with_outcome(record, mapping).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("Transform failed for {}: {}", source_id, e);
                    report.failed.push(FailedRecord {
                        source_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let cache_hit = matches!(transformed.outcome, Outcome::Hit { .. });

            let product_id = if options.dry_run {
                None
            } else {
                match self.catalog.create_product(&transformed.product).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!("Create failed for {}: {:#}", source_id, e);
                        report.failed.push(FailedRecord {
                            source_id,
                            reason: format!("create failed: {:#}", e),
                        });
                        continue;
                    }
                }
            };

            report.created.push(CreatedProduct {
                source_id,
                product_id,
                cache_hit,
            });
        }

        let stats = self.transformer.cache_stats().await;
        tracing::info!(
            "Sync finished: {} created ({} from cache), {} already listed, {} duplicates, {} failed; cache hit rate {:.1}%",
            report.created.len(),
            report.cache_hits(),
            report.skipped_existing.len(),
            report.skipped_duplicate.len(),
            report.failed.len(),
            stats.hit_rate * 100.0
        );

        Ok(report)
    }
}
