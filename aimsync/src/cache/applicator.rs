//! Build a product for a new record from a cached example
//!
//! Only the structure of the cached output is reused. Title and variant leaf
//! values always come from the new record.

use regex::{Captures, RegexBuilder};

use super::types::{CachedSource, Template};
use crate::mapping::MappedFields;
use crate::product::{ProductEnvelope, Variant};
use crate::record::SourceRecord;

/// Synthesize a product for `candidate` from the most recently added example
/// in `template`. Returns `None` if the template has no examples.
pub fn apply_template(
    candidate: &SourceRecord,
    template: &Template,
    mapped: &MappedFields,
) -> Option<ProductEnvelope> {
    let example = template.latest()?;
    let cached = &example.shopify_product.product;
    let mut product = cached.clone();

    product.title = mapped
        .get("title")
        .cloned()
        .unwrap_or_else(|| candidate.derived_title());

    product.body_html = substitute_source_values(&cached.body_html, &example.source_product, candidate);

    product.vendor = mapped
        .get("vendor")
        .cloned()
        .or_else(|| candidate.manufacturer())
        .unwrap_or_else(|| cached.vendor.clone());

    product.product_type = mapped
        .get("product_type")
        .cloned()
        .or_else(|| candidate.subcategory().or_else(|| candidate.category()))
        .unwrap_or_else(|| cached.product_type.clone());

    product.tags = mapped
        .get("tags")
        .cloned()
        .or_else(|| record_tags(candidate))
        .unwrap_or_else(|| cached.tags.clone());

    product.published = false;

    let mut variant = Variant::from_record(candidate);
    if let Some(shape) = cached.variants.first() {
        for (k, v) in &shape.extra {
            variant.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    product.variants = vec![variant];

    product.images.clear();

    Some(ProductEnvelope::new(product))
}

fn record_tags(record: &SourceRecord) -> Option<String> {
    let tags: Vec<String> = [record.category(), record.subcategory(), record.manufacturer()]
        .into_iter()
        .flatten()
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(", "))
    }
}

/// Replace the cached record's manufacturer, model, description, category and
/// subcategory values (case-insensitive, literal) with the candidate's.
///
/// All values are matched in a single pass, longest first, so replacement text
/// is never substituted again.
fn substitute_source_values(body: &str, cached: &CachedSource, candidate: &SourceRecord) -> String {
    let mut pairs: Vec<(String, String)> = [
        (&cached.manufacturer, candidate.manufacturer()),
        (&cached.model, candidate.model()),
        (&cached.description, candidate.description()),
        (&cached.category, candidate.category()),
        (&cached.subcategory, candidate.subcategory()),
    ]
    .into_iter()
    .filter_map(|(from, to)| {
        let from = from.as_deref()?.trim();
        if from.is_empty() {
            return None;
        }
        Some((from.to_lowercase(), to.unwrap_or_default()))
    })
    .collect();

    if pairs.is_empty() {
        return body.to_string();
    }
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let alternation = pairs
        .iter()
        .map(|(from, _)| bounded(from))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = match RegexBuilder::new(&alternation).case_insensitive(true).build() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Skipping description substitution: {}", e);
            return body.to_string();
        }
    };

    pattern
        .replace_all(body, |caps: &Captures| {
            let matched = &caps[0];
            let lowered = matched.to_lowercase();
            pairs
                .iter()
                .find(|(from, _)| *from == lowered)
                .map(|(_, to)| to.clone())
                .unwrap_or_else(|| matched.to_string())
        })
        .into_owned()
}

/// Literal pattern for `value`, anchored at word boundaries on the ends that
/// are alphanumeric so short values never match inside longer words.
fn bounded(value: &str) -> String {
    let escaped = regex::escape(value);
    let starts_word = value.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = value.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;
    use crate::cache::types::Example;
    use crate::product::ShopifyProduct;
    use chrono::Utc;
    use serde_json::json;

    fn cached_template() -> Template {
        let first = SourceRecord::from_json(json!({
            "Mfg": "Yamaha",
            "Model": "FS800",
            "Desc": "Concert acoustic",
            "Cat Desc": "Fretted",
            "Sub Desc": "Acoustic",
            "SKU": "YAM-FS800",
            "Price": "199.99"
        }));
        let key = CacheKey::from_record(&first);
        let mut template = Template::new(&key, Utc::now());

        let mut variant = Variant::from_record(&first);
        variant.extra.insert("requires_shipping".to_string(), json!(true));

        for (title, body) in [
            ("Older", "<p>older body</p>"),
            ("Yamaha FS800", "<p>The YAMAHA fs800 concert acoustic is a great first guitar.</p>"),
        ] {
            template.examples.push(Example {
                source_product: CachedSource::from_record(&first),
                shopify_product: ProductEnvelope::new(ShopifyProduct {
                    title: title.to_string(),
                    body_html: body.to_string(),
                    vendor: "Yamaha".to_string(),
                    product_type: "Acoustic Guitars".to_string(),
                    tags: "fretted, acoustic, yamaha".to_string(),
                    published: true,
                    variants: vec![variant.clone()],
                    images: vec![json!({"src": "https://cdn.example.com/fs800.jpg"})],
                    extra: Default::default(),
                }),
                cached_at: Utc::now(),
            });
        }
        template
    }

    fn second_guitar() -> SourceRecord {
        SourceRecord::from_json(json!({
            "Mfg": "Yamaha",
            "Model": "FG830",
            "Desc": "Dreadnought acoustic",
            "Cat Desc": "Fretted",
            "Sub Desc": "Acoustic",
            "SKU": "YAM-FG830",
            "Price": "249",
            "Qty": 4,
            "UPC": "086792012345"
        }))
    }

    #[test]
    fn test_uses_latest_example_and_fresh_identity() {
        let product = apply_template(&second_guitar(), &cached_template(), &MappedFields::new())
            .unwrap()
            .product;

        assert_eq!(product.title, "Yamaha FG830");
        assert_eq!(
            product.body_html,
            "<p>The Yamaha FG830 Dreadnought acoustic is a great first guitar.</p>"
        );
        assert!(!product.published);
        assert!(product.images.is_empty());

        assert_eq!(product.variants.len(), 1);
        let variant = &product.variants[0];
        assert_eq!(variant.sku, "YAM-FG830");
        assert_eq!(variant.price, "249.00");
        assert_eq!(variant.inventory_quantity, 4);
        assert_eq!(variant.barcode.as_deref(), Some("086792012345"));
        assert_eq!(variant.extra["requires_shipping"], json!(true));
    }

    #[test]
    fn test_substitution_keeps_whole_words() {
        let cached = CachedSource {
            model: Some("X".to_string()),
            manufacturer: Some("D'Addario".to_string()),
            ..Default::default()
        };
        let candidate = SourceRecord::from_json(json!({"Model": "XT", "Mfg": "Ernie Ball"}));

        assert_eq!(
            substitute_source_values(
                "<p>Excellent tone from the X by D'Addario.</p>",
                &cached,
                &candidate
            ),
            "<p>Excellent tone from the XT by Ernie Ball.</p>"
        );
    }

    #[test]
    fn test_mapped_fields_take_precedence() {
        let mapped = MappedFields::from([
            ("title".to_string(), "Yamaha FG830 Dreadnought".to_string()),
            ("vendor".to_string(), "Yamaha Corporation".to_string()),
        ]);
        let product = apply_template(&second_guitar(), &cached_template(), &mapped)
            .unwrap()
            .product;

        assert_eq!(product.title, "Yamaha FG830 Dreadnought");
        assert_eq!(product.vendor, "Yamaha Corporation");
    }

    #[test]
    fn test_falls_back_to_template_values() {
        let candidate = SourceRecord::from_json(json!({"Model": "FG830", "SKU": "X1"}));
        let product = apply_template(&candidate, &cached_template(), &MappedFields::new())
            .unwrap()
            .product;

        assert_eq!(product.vendor, "Yamaha");
        assert_eq!(product.product_type, "Acoustic Guitars");
        assert_eq!(product.tags, "fretted, acoustic, yamaha");
    }

    #[test]
    fn test_empty_template_yields_none() {
        let mut template = cached_template();
        template.examples.clear();
        assert!(apply_template(&second_guitar(), &template, &MappedFields::new()).is_none());
    }
}
