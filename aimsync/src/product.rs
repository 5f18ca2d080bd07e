//! Target schema for the commerce platform
//!
//! Mirrors the `product` payload accepted by the create-product endpoint. Fields
//! this crate does not interpret are kept in `extra` so generated output
//! round-trips through the cache without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::SourceRecord;

/// `{ "product": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub product: ShopifyProduct,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopifyProduct {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub body_html: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub vendor: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub product_type: String,
    /// Comma separated tag list
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tags: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub published: bool,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub variants: Vec<Variant>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub images: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, deserialize_with = "lenient::price")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sku: String,
    #[serde(default, deserialize_with = "lenient::quantity")]
    pub inventory_quantity: i64,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub barcode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductEnvelope {
    pub fn new(product: ShopifyProduct) -> Self {
        Self { product }
    }

    pub fn sku(&self) -> Option<&str> {
        self.product
            .variants
            .first()
            .map(|v| v.sku.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl Variant {
    /// The single variant for a record, built from its own price, SKU,
    /// quantity and barcode.
    pub fn from_record(record: &SourceRecord) -> Self {
        let mut extra = Map::new();
        extra.insert(
            "inventory_management".to_string(),
            Value::String("shopify".to_string()),
        );
        Self {
            price: record.price().unwrap_or_else(|| "0.00".to_string()),
            sku: record.sku().unwrap_or_default(),
            inventory_quantity: record.quantity().unwrap_or(0),
            barcode: record.barcode(),
            extra,
        }
    }
}

impl ShopifyProduct {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Generated products come back in whatever shape the model picked: numbers
/// for prices, arrays for tags, `null` for fields it had nothing for. These
/// accept the shapes the create-product endpoint itself accepts.
mod lenient {
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;

    pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(optional_string(deserializer)?.unwrap_or_default())
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(D::Error::custom(format!("expected a string, got {}", other))),
        }
    }

    /// Numbers are rendered with two decimal places, strings are kept as given.
    pub fn price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => match n.as_f64() {
                Some(p) => Ok(format!("{:.2}", p)),
                None => Ok(n.to_string()),
            },
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(D::Error::custom(format!("expected a price, got {}", other))),
        }
    }

    pub fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| D::Error::custom(format!("quantity out of range: {}", n))),
            Value::String(s) if s.trim().is_empty() => Ok(0),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| f as i64)
                .map_err(|_| D::Error::custom(format!("expected a quantity, got {:?}", s))),
            other => Err(D::Error::custom(format!("expected a quantity, got {}", other))),
        }
    }

    /// A comma separated string, or an array of tags joined with ", ".
    pub fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Array(items) => {
                let tags: Vec<String> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|t| !t.is_empty())
                    .collect();
                Ok(tags.join(", "))
            }
            other => Err(D::Error::custom(format!("expected tags, got {}", other))),
        }
    }
}
