use regex::Regex;
use std::sync::OnceLock;

use super::types::{FieldMapping, MappedFields};
use crate::record::SourceRecord;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

/// Project a record onto the target schema using direct and combined rules.
///
/// Generation-rule fields are left for the generator. Blank results are
/// omitted so callers can fall back to their own defaults.
pub fn apply_field_mappings(record: &SourceRecord, mapping: &FieldMapping) -> MappedFields {
    let mut mapped = MappedFields::new();

    for (target, source) in &mapping.direct_mappings {
        if let Some(value) = record.non_empty(source) {
            mapped.insert(target.clone(), value);
        }
    }

    for (target, combined) in &mapping.combined_fields {
        let rendered = render_template(&combined.template, record);
        if !rendered.is_empty() {
            mapped.insert(target.clone(), rendered);
        }
    }

    mapped
}

/// Substitute `{field}` placeholders and collapse the whitespace left behind by
/// missing values.
fn render_template(template: &str, record: &SourceRecord) -> String {
    let substituted = placeholder_regex().replace_all(template, |caps: &regex::Captures| {
        record
            .text(caps[1].trim())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    });
    substituted.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::types::CombinedField;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn mapping() -> FieldMapping {
        FieldMapping {
            direct_mappings: BTreeMap::from([
                ("vendor".to_string(), "Mfg".to_string()),
                ("barcode".to_string(), "UPC".to_string()),
            ]),
            combined_fields: BTreeMap::from([(
                "title".to_string(),
                CombinedField {
                    template: "{Mfg} {Model} {Color}".to_string(),
                    fields: vec!["Mfg".into(), "Model".into(), "Color".into()],
                },
            )]),
            generation_rules: BTreeMap::from([(
                "body_html".to_string(),
                "Describe it".to_string(),
            )]),
            metadata: None,
        }
    }

    #[test]
    fn test_direct_and_combined() {
        let record = SourceRecord::from_json(json!({
            "Mfg": "Fender",
            "Model": "Player Strat",
            "Color": "Sunburst",
            "UPC": 885978123456u64
        }));

        let mapped = apply_field_mappings(&record, &mapping());
        assert_eq!(mapped["vendor"], "Fender");
        assert_eq!(mapped["barcode"], "885978123456");
        assert_eq!(mapped["title"], "Fender Player Strat Sunburst");
        assert!(!mapped.contains_key("body_html"));
    }

    #[test]
    fn test_missing_values_collapse() {
        let record = SourceRecord::from_json(json!({"Model": "FS800", "UPC": "  "}));

        let mapped = apply_field_mappings(&record, &mapping());
        assert_eq!(mapped["title"], "FS800");
        assert!(!mapped.contains_key("vendor"));
        assert!(!mapped.contains_key("barcode"));
    }

    #[test]
    fn test_all_missing_omits_combined() {
        let mapped = apply_field_mappings(&SourceRecord::default(), &mapping());
        assert!(mapped.is_empty());
    }
}
