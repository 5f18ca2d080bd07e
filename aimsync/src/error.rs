use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Field mapping generation failed: {0}")]
    MappingGeneration(String),

    #[error("Transform cache at {path} is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Transform failed for {source_id}: {reason}")]
    Transform { source_id: String, reason: String },

    #[error("Product catalog error: {0}")]
    Catalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn transform(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transform {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Source identity for errors scoped to a single product.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Transform { source_id, .. } => Some(source_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_carries_identity() {
        let err = Error::transform("SKU-42", "generator returned empty response");
        assert_eq!(err.source_id(), Some("SKU-42"));

        let msg = err.to_string();
        assert!(msg.contains("SKU-42"));
        assert!(msg.contains("empty response"));
    }

    #[test]
    fn test_cache_corrupt_display() {
        let err = Error::CacheCorrupt {
            path: PathBuf::from("data/transform-cache.json"),
            reason: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("transform-cache.json"));
        assert!(msg.contains("corrupt"));
        assert!(err.source_id().is_none());
    }
}
