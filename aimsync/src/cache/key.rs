//! Cache key derivation

use std::fmt;

use crate::record::SourceRecord;

const UNKNOWN: &str = "unknown";

/// Lowercased, trimmed `(category, subcategory, brand)` triple.
///
/// Category and brand default to `"unknown"`, subcategory to the empty
/// string. Records with equal triples share one template regardless of
/// their other fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub category: String,
    pub subcategory: String,
    pub brand: String,
}

impl CacheKey {
    pub fn new(category: Option<&str>, subcategory: Option<&str>, brand: Option<&str>) -> Self {
        Self {
            category: normalize(category, UNKNOWN),
            subcategory: normalize(subcategory, ""),
            brand: normalize(brand, UNKNOWN),
        }
    }

    pub fn from_record(record: &SourceRecord) -> Self {
        Self::new(
            record.category().as_deref(),
            record.subcategory().as_deref(),
            record.manufacturer().as_deref(),
        )
    }

    /// Persisted form: `category|subcategory|brand`
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

fn normalize(component: Option<&str>, default: &str) -> String {
    match component.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_lowercase(),
        _ => default.to_string(),
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.category, self.subcategory, self.brand)
    }
}

impl From<&SourceRecord> for CacheKey {
    fn from(record: &SourceRecord) -> Self {
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        let record = SourceRecord::from_json(json!({
            "Mfg": "Yamaha",
            "Model": "FS800",
            "Cat Desc": "Fretted",
            "Sub Desc": "Acoustic"
        }));
        assert_eq!(CacheKey::from_record(&record).as_string(), "fretted|acoustic|yamaha");
    }

    #[test]
    fn test_defaults_for_missing_components() {
        let key = CacheKey::from_record(&SourceRecord::default());
        assert_eq!(key.as_string(), "unknown||unknown");

        let record = SourceRecord::from_json(json!({"Cat Desc": "  ", "Mfg": null}));
        assert_eq!(CacheKey::from_record(&record).as_string(), "unknown||unknown");
    }

    #[test]
    fn test_case_and_blank_fields_collapse() {
        let a = SourceRecord::from_json(json!({"Cat Desc": "Guitars", "": "", "Mfg": "Yamaha"}));
        let b = SourceRecord::from_json(json!({"Cat Desc": "guitars", "Mfg": "YAMAHA"}));
        assert_eq!(CacheKey::from_record(&a), CacheKey::from_record(&b));
    }

    proptest! {
        #[test]
        fn prop_key_ignores_unrelated_fields(
            category in "[A-Za-z ]{0,12}",
            brand in "[A-Za-z]{0,8}",
            extra in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..6),
        ) {
            let mut base = SourceRecord::from_json(json!({"Cat Desc": category, "Mfg": brand}));
            let plain = CacheKey::from_record(&base);

            for (k, v) in &extra {
                base.insert(format!("x-{}", k), v.clone());
            }
            prop_assert_eq!(CacheKey::from_record(&base), plain);
        }

        #[test]
        fn prop_key_case_insensitive(
            category in "[A-Za-z]{1,12}",
            subcategory in "[A-Za-z]{0,12}",
            brand in "[A-Za-z]{1,8}",
        ) {
            let lower = SourceRecord::from_json(json!({
                "Cat Desc": category.to_lowercase(),
                "Sub Desc": subcategory.to_lowercase(),
                "Mfg": brand.to_lowercase(),
            }));
            let upper = SourceRecord::from_json(json!({
                "Cat Desc": category.to_uppercase(),
                "Sub Desc": subcategory.to_uppercase(),
                "Mfg": brand.to_uppercase(),
            }));
            prop_assert_eq!(CacheKey::from_record(&lower), CacheKey::from_record(&upper));
        }
    }
}
