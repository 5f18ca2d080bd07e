//! Field mapping document types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target field -> value, produced by applying a [`FieldMapping`] to a record
pub type MappedFields = BTreeMap<String, String>;

pub const MAPPING_VERSION: &str = "1.0";

/// Persisted mapping from source record fields to target schema fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Target field -> source field, copied 1:1
    #[serde(default)]
    pub direct_mappings: BTreeMap<String, String>,

    /// Target field -> template over several source fields
    #[serde(default)]
    pub combined_fields: BTreeMap<String, CombinedField>,

    /// Target field -> instruction passed to the generator
    #[serde(default)]
    pub generation_rules: BTreeMap<String, String>,

    #[serde(default)]
    pub metadata: Option<MappingMetadata>,
}

/// Template string with `{sourceField}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedField {
    pub template: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingMetadata {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub sample_size: usize,
    #[serde(default)]
    pub note: String,
}

impl FieldMapping {
    /// True when the mapping carries no rules at all
    pub fn is_empty(&self) -> bool {
        self.direct_mappings.is_empty()
            && self.combined_fields.is_empty()
            && self.generation_rules.is_empty()
    }

    /// All target fields the mapping knows about
    pub fn target_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .direct_mappings
            .keys()
            .chain(self.combined_fields.keys())
            .chain(self.generation_rules.keys())
            .map(String::as_str)
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_shape() {
        let value = json!({
            "directMappings": {"vendor": "Mfg"},
            "combinedFields": {"title": {"template": "{Mfg} {Model}", "fields": ["Mfg", "Model"]}},
            "generationRules": {"body_html": "Describe the instrument"},
            "metadata": {
                "generatedAt": "2026-01-02T03:04:05Z",
                "version": "1.0",
                "sampleSize": 5,
                "note": "derived from inventory sample"
            }
        });

        let mapping: FieldMapping = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(mapping.direct_mappings["vendor"], "Mfg");
        assert_eq!(mapping.combined_fields["title"].fields, vec!["Mfg", "Model"]);
        assert_eq!(mapping.metadata.as_ref().unwrap().sample_size, 5);
        assert_eq!(mapping.target_fields(), vec!["body_html", "title", "vendor"]);

        assert_eq!(serde_json::to_value(&mapping).unwrap(), value);
    }

    #[test]
    fn test_empty_mapping() {
        let mapping: FieldMapping = serde_json::from_value(json!({})).unwrap();
        assert!(mapping.is_empty());
        assert!(mapping.metadata.is_none());
    }
}
