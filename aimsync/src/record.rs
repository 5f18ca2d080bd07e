//! Source records read from the inventory system
//!
//! Records arrive with externally defined field names (`Mfg`, `Cat Desc`, ...).
//! [`SourceRecord`] keeps the full field map for prompts and field mapping, and
//! exposes the fields the transform pipeline relies on through typed accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Manufacturer / brand
pub const FIELD_MANUFACTURER: &str = "Mfg";
pub const FIELD_MODEL: &str = "Model";
pub const FIELD_DESCRIPTION: &str = "Desc";
pub const FIELD_CATEGORY: &str = "Cat Desc";
pub const FIELD_SUBCATEGORY: &str = "Sub Desc";
pub const FIELD_SKU: &str = "SKU";
pub const FIELD_PRICE: &str = "Price";
pub const FIELD_QUANTITY: &str = "Qty";
pub const FIELD_BARCODE: &str = "UPC";

/// One inventory item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord {
    fields: BTreeMap<String, Value>,
    #[serde(skip)]
    row: Option<usize>,
}

impl SourceRecord {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields, row: None }
    }

    /// Build a record from a JSON object; non-object values yield an empty record.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map.into_iter().collect()),
            _ => Self::default(),
        }
    }

    /// Attach the row index the record was read from (spreadsheet exports).
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Field value rendered as text. Numbers and booleans are stringified;
    /// null, arrays and objects count as absent.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`text`](Self::text) but trimmed, with blank values treated as absent.
    pub fn non_empty(&self, field: &str) -> Option<String> {
        self.text(field)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn manufacturer(&self) -> Option<String> {
        self.non_empty(FIELD_MANUFACTURER)
    }

    pub fn model(&self) -> Option<String> {
        self.non_empty(FIELD_MODEL)
    }

    pub fn description(&self) -> Option<String> {
        self.non_empty(FIELD_DESCRIPTION)
    }

    pub fn category(&self) -> Option<String> {
        self.non_empty(FIELD_CATEGORY)
    }

    pub fn subcategory(&self) -> Option<String> {
        self.non_empty(FIELD_SUBCATEGORY)
    }

    pub fn sku(&self) -> Option<String> {
        self.non_empty(FIELD_SKU)
    }

    pub fn barcode(&self) -> Option<String> {
        self.non_empty(FIELD_BARCODE)
    }

    /// Price as a decimal string with two places; unparseable prices are absent.
    pub fn price(&self) -> Option<String> {
        let raw = self.non_empty(FIELD_PRICE)?;
        let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
        cleaned.parse::<f64>().ok().map(|p| format!("{:.2}", p))
    }

    /// On-hand quantity; fractional quantities are truncated.
    pub fn quantity(&self) -> Option<i64> {
        match self.fields.get(FIELD_QUANTITY)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
            _ => None,
        }
    }

    /// Identity used to correlate errors: the SKU, else the row index.
    pub fn identity(&self) -> String {
        match (self.sku(), self.row) {
            (Some(sku), _) => sku,
            (None, Some(row)) => format!("row {}", row),
            (None, None) => "unidentified record".to_string(),
        }
    }

    /// Title derived from the record's own identity fields.
    pub fn derived_title(&self) -> String {
        let parts: Vec<String> = [self.manufacturer(), self.model()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            self.description().unwrap_or_else(|| self.identity())
        } else {
            parts.join(" ")
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guitar() -> SourceRecord {
        SourceRecord::from_json(json!({
            "Mfg": "Yamaha",
            "Model": "FS800",
            "Desc": "Acoustic Guitar",
            "Cat Desc": "Fretted",
            "Sub Desc": " Acoustic ",
            "SKU": "YAM-FS800",
            "Price": "$1,199.5",
            "Qty": 3,
            "UPC": ""
        }))
    }

    #[test]
    fn test_accessors() {
        let record = guitar();
        assert_eq!(record.manufacturer().as_deref(), Some("Yamaha"));
        assert_eq!(record.subcategory().as_deref(), Some("Acoustic"));
        assert_eq!(record.price().as_deref(), Some("1199.50"));
        assert_eq!(record.quantity(), Some(3));
        assert_eq!(record.barcode(), None);
    }

    #[test]
    fn test_identity_prefers_sku() {
        assert_eq!(guitar().with_row(7).identity(), "YAM-FS800");

        let record = SourceRecord::from_json(json!({"Mfg": "Fender"})).with_row(7);
        assert_eq!(record.identity(), "row 7");
    }

    #[test]
    fn test_derived_title() {
        assert_eq!(guitar().derived_title(), "Yamaha FS800");

        let record = SourceRecord::from_json(json!({"Desc": "Guitar strap"}));
        assert_eq!(record.derived_title(), "Guitar strap");
    }

    #[test]
    fn test_quantity_from_string() {
        let record = SourceRecord::from_json(json!({"Qty": " 12.0 "}));
        assert_eq!(record.quantity(), Some(12));
    }

    #[test]
    fn test_serde_is_transparent() {
        let record = guitar();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Mfg"], json!("Yamaha"));
        let back: SourceRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.manufacturer(), record.manufacturer());
    }
}
