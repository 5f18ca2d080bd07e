pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod mapping;
pub mod product;
pub mod record;
pub mod source;
pub mod sync;
pub mod transform;

pub use config::Config;
pub use error::{Error, Result};
pub use mapping::FieldMappingResolver;
pub use product::ProductEnvelope;
pub use record::SourceRecord;
pub use transform::Transformer;
