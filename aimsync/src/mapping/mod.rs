//! Field mapping from inventory records to the product schema
//!
//! A mapping is derived once from a small sample of source records, persisted,
//! and reused for every later transform.
//!
//! # Example
//!
//! ```json
//! {
//!   "directMappings": { "vendor": "Mfg", "product_type": "Cat Desc" },
//!   "combinedFields": {
//!     "title": { "template": "{Mfg} {Model}", "fields": ["Mfg", "Model"] }
//!   },
//!   "generationRules": { "body_html": "Write two short paragraphs..." },
//!   "metadata": { "generatedAt": "...", "version": "1.0", "sampleSize": 5, "note": "..." }
//! }
//! ```

pub mod apply;
pub mod resolver;
pub mod types;

pub use apply::apply_field_mappings;
pub use resolver::FieldMappingResolver;
pub use types::{CombinedField, FieldMapping, MappedFields, MappingMetadata};
