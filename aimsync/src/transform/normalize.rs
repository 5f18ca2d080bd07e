//! Miss-path normalization of generator output

use serde_json::Value;

use crate::generation::strip_code_fence;
use crate::mapping::MappedFields;
use crate::product::{ProductEnvelope, ShopifyProduct, Variant};
use crate::record::SourceRecord;

/// Parse raw generator text into a normalized product envelope.
///
/// Accepts either `{"product": {...}}` or the inner product object directly.
pub fn normalize_output(
    text: &str,
    record: &SourceRecord,
    mapped: &MappedFields,
) -> anyhow::Result<ProductEnvelope> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("generator returned an empty response");
    }

    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| anyhow::anyhow!("generator response is not JSON: {}", e))?;

    let inner = match value {
        Value::Object(mut map) => match map.remove("product") {
            Some(product @ Value::Object(_)) => product,
            Some(other) => {
                map.insert("product".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => anyhow::bail!("generator response is not a JSON object: {}", other),
    };

    let product: ShopifyProduct = serde_json::from_value(inner)
        .map_err(|e| anyhow::anyhow!("generator response does not match the product shape: {}", e))?;

    Ok(normalize_envelope(ProductEnvelope::new(product), record, mapped))
}

/// Enforce the output invariants: draft, no images, exactly one variant.
///
/// Idempotent: normalizing an already normalized envelope returns it unchanged.
pub fn normalize_envelope(
    mut envelope: ProductEnvelope,
    record: &SourceRecord,
    mapped: &MappedFields,
) -> ProductEnvelope {
    let product = &mut envelope.product;

    if product.title.trim().is_empty() {
        product.title = mapped
            .get("title")
            .cloned()
            .unwrap_or_else(|| record.derived_title());
    }

    product.published = false;
    product.images.clear();

    if product.variants.is_empty() {
        product.variants.push(Variant::from_record(record));
    } else {
        product.variants.truncate(1);
        let variant = &mut product.variants[0];
        if variant.sku.trim().is_empty() {
            variant.sku = record.sku().unwrap_or_default();
        }
        if variant.price.trim().is_empty() {
            if let Some(price) = record.price() {
                variant.price = price;
            }
        }
        if variant.barcode.is_none() {
            variant.barcode = record.barcode();
        }
    }

    envelope
}
