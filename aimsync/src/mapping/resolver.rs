//! One-time derivation and persistence of the field mapping

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::OnceCell;

use super::types::{CombinedField, FieldMapping, MappingMetadata, MAPPING_VERSION};
use crate::config::{GenerationConfig, MappingConfig};
use crate::generation::{strip_code_fence, GenerationOptions, TextGenerator};
use crate::record::SourceRecord;
use crate::source::RecordSource;
use crate::{Error, Result};

const MAPPING_SYSTEM_PROMPT: &str = "You are a data mapping expert for retail inventory systems. \
You analyze product records exported from a point-of-sale inventory system and decide how their \
fields map onto an e-commerce product schema. Always answer with a single JSON object.";

/// Target schema fields the generator may map onto
const TARGET_FIELDS: &[&str] = &[
    "title",
    "body_html",
    "vendor",
    "product_type",
    "tags",
    "price",
    "sku",
    "inventory_quantity",
    "barcode",
];

/// The part of the mapping document the generator is asked to produce
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedMapping {
    #[serde(default)]
    direct_mappings: Option<BTreeMap<String, String>>,
    #[serde(default)]
    combined_fields: Option<BTreeMap<String, CombinedField>>,
    #[serde(default)]
    generation_rules: Option<BTreeMap<String, String>>,
}

/// Loads the persisted field mapping, or derives it from a record sample on
/// first use.
pub struct FieldMappingResolver {
    path: PathBuf,
    sample_size: usize,
    temperature: f32,
    generator: Arc<dyn TextGenerator>,
    source: Arc<dyn RecordSource>,
    mapping: OnceCell<FieldMapping>,
}

impl FieldMappingResolver {
    pub fn new(
        path: impl Into<PathBuf>,
        generator: Arc<dyn TextGenerator>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self {
            path: path.into(),
            sample_size: MappingConfig::default().sample_size,
            temperature: GenerationConfig::default().mapping_temperature,
            generator,
            source,
            mapping: OnceCell::new(),
        }
    }

    pub fn from_config(
        mapping: &MappingConfig,
        generation: &GenerationConfig,
        generator: Arc<dyn TextGenerator>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self {
            sample_size: mapping.sample_size,
            temperature: generation.mapping_temperature,
            ..Self::new(&mapping.path, generator, source)
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the field mapping, loading or generating it on first call.
    ///
    /// Once a mapping is persisted the generator is never consulted again
    /// until [`reset`](Self::reset) removes it.
    pub async fn resolve(&self) -> Result<&FieldMapping> {
        self.mapping
            .get_or_try_init(|| async {
                if let Some(mapping) = self.load().await? {
                    tracing::info!("Loaded field mapping from {:?}", self.path);
                    return Ok(mapping);
                }

                let mapping = self.generate().await?;
                self.persist(&mapping).await?;
                tracing::info!(
                    "Generated field mapping with {} target fields, saved to {:?}",
                    mapping.target_fields().len(),
                    self.path
                );
                Ok::<_, Error>(mapping)
            })
            .await
    }

    /// Forget the current mapping and delete the persisted document.
    pub async fn reset(&mut self) -> Result<()> {
        self.mapping.take();
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!("Removed field mapping {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self) -> Result<Option<FieldMapping>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persist atomically: write .tmp then rename
    async fn persist(&self, mapping: &FieldMapping) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(mapping)?).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn generate(&self) -> Result<FieldMapping> {
        let sample = self
            .source
            .sample(self.sample_size)
            .await
            .map_err(|e| Error::MappingGeneration(format!("Failed to sample records: {:#}", e)))?;

        if sample.is_empty() {
            return Err(Error::MappingGeneration(format!(
                "Source '{}' returned no records to analyze",
                self.source.source_name()
            )));
        }

        tracing::info!(
            "Deriving field mapping from {} records of '{}' with {}",
            sample.len(),
            self.source.source_name(),
            self.generator.model_name()
        );

        let prompt = build_mapping_prompt(&sample)?;
        let response = self
            .generator
            .generate(
                MAPPING_SYSTEM_PROMPT,
                &prompt,
                &GenerationOptions::json(self.temperature),
            )
            .await
            .map_err(|e| Error::MappingGeneration(format!("Generation call failed: {:#}", e)))?;

        let mut mapping = parse_generated_mapping(&response)?;
        mapping.metadata = Some(MappingMetadata {
            generated_at: Utc::now(),
            version: MAPPING_VERSION.to_string(),
            sample_size: sample.len(),
            note: format!(
                "Derived from {} sample records of '{}'",
                sample.len(),
                self.source.source_name()
            ),
        });
        Ok(mapping)
    }
}

fn build_mapping_prompt(sample: &[SourceRecord]) -> Result<String> {
    let records: Vec<serde_json::Value> = sample.iter().map(SourceRecord::to_json).collect();
    let mut source_fields: Vec<&str> = sample
        .iter()
        .flat_map(|r| r.fields().keys().map(String::as_str))
        .collect();
    source_fields.sort_unstable();
    source_fields.dedup();

    Ok(format!(
        "Analyze these sample inventory records and map their fields onto the product schema.\n\n\
Sample records:\n{records}\n\n\
Source fields: {source}\n\
Target fields: {target}\n\n\
Respond with a JSON object with exactly these keys:\n\
- \"directMappings\": object of target field -> single source field copied as is\n\
- \"combinedFields\": object of target field -> {{\"template\": string using {{SourceField}} placeholders, \"fields\": [source fields used]}}\n\
- \"generationRules\": object of target field -> instruction for writing that field from the record (descriptions, tags)\n\n\
Only use source field names that appear in the sample.",
        records = serde_json::to_string_pretty(&records)?,
        source = source_fields.join(", "),
        target = TARGET_FIELDS.join(", "),
    ))
}

fn parse_generated_mapping(response: &str) -> Result<FieldMapping> {
    let generated: GeneratedMapping = serde_json::from_str(strip_code_fence(response)).map_err(|e| {
        Error::MappingGeneration(format!("Generator returned unparseable mapping: {}", e))
    })?;

    if generated.direct_mappings.is_none()
        && generated.combined_fields.is_none()
        && generated.generation_rules.is_none()
    {
        return Err(Error::MappingGeneration(
            "Generator response contains none of directMappings, combinedFields, generationRules"
                .to_string(),
        ));
    }

    Ok(FieldMapping {
        direct_mappings: generated.direct_mappings.unwrap_or_default(),
        combined_fields: generated.combined_fields.unwrap_or_default(),
        generation_rules: generated.generation_rules.unwrap_or_default(),
        metadata: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationOptions;
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedGenerator {
        response: String,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            options: &GenerationOptions,
        ) -> anyhow::Result<String> {
            assert!(user_prompt.contains("Sample records"));
            assert_eq!(options.response_format, crate::generation::ResponseFormat::Json);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn source(n: usize) -> Arc<MemorySource> {
        let records = (0..n)
            .map(|i| {
                SourceRecord::from_json(json!({
                    "Mfg": "Yamaha",
                    "Model": format!("FS{}", 800 + i),
                    "Cat Desc": "Fretted"
                }))
            })
            .collect();
        Arc::new(MemorySource::new("inventory", records))
    }

    const MAPPING_RESPONSE: &str = r#"{
        "directMappings": {"vendor": "Mfg", "product_type": "Cat Desc"},
        "combinedFields": {"title": {"template": "{Mfg} {Model}", "fields": ["Mfg", "Model"]}},
        "generationRules": {"body_html": "Two paragraphs"}
    }"#;

    #[tokio::test]
    async fn test_generates_then_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("field-mapping.json");
        let generator = FixedGenerator::new(MAPPING_RESPONSE);

        let resolver = FieldMappingResolver::new(&path, generator.clone(), source(8));
        let mapping = resolver.resolve().await.unwrap();

        assert_eq!(mapping.direct_mappings["vendor"], "Mfg");
        let metadata = mapping.metadata.as_ref().unwrap();
        assert_eq!(metadata.sample_size, 5);
        assert_eq!(metadata.version, MAPPING_VERSION);
        assert!(path.exists());

        // Second call is served from memory
        resolver.resolve().await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loads_persisted_without_generation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("field-mapping.json");

        let first = FieldMappingResolver::new(&path, FixedGenerator::new(MAPPING_RESPONSE), source(3));
        let generated = first.resolve().await.unwrap().clone();

        let generator = FixedGenerator::new("not json");
        let second = FieldMappingResolver::new(&path, generator.clone(), source(3));
        let loaded = second.resolve().await.unwrap();

        assert_eq!(loaded, &generated);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparseable_response_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("field-mapping.json");

        let resolver = FieldMappingResolver::new(&path, FixedGenerator::new("Sure! Here is"), source(3));
        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::MappingGeneration(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fenced_response_is_accepted() {
        let dir = TempDir::new().unwrap();
        let fenced = format!("```json\n{}\n```", MAPPING_RESPONSE);
        let resolver = FieldMappingResolver::new(
            dir.path().join("field-mapping.json"),
            FixedGenerator::new(&fenced),
            source(3),
        );

        let mapping = resolver.resolve().await.unwrap();
        assert_eq!(mapping.combined_fields["title"].template, "{Mfg} {Model}");
    }

    #[tokio::test]
    async fn test_response_without_mapping_keys_fails() {
        let dir = TempDir::new().unwrap();
        let resolver = FieldMappingResolver::new(
            dir.path().join("field-mapping.json"),
            FixedGenerator::new(r#"{"mapping": {}}"#),
            source(3),
        );
        assert!(matches!(
            resolver.resolve().await,
            Err(Error::MappingGeneration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_source_fails() {
        let dir = TempDir::new().unwrap();
        let resolver = FieldMappingResolver::new(
            dir.path().join("field-mapping.json"),
            FixedGenerator::new(MAPPING_RESPONSE),
            source(0),
        );
        assert!(matches!(
            resolver.resolve().await,
            Err(Error::MappingGeneration(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_regenerates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("field-mapping.json");
        let generator = FixedGenerator::new(MAPPING_RESPONSE);

        let mut resolver = FieldMappingResolver::new(&path, generator.clone(), source(3)).with_sample_size(2);
        resolver.resolve().await.unwrap();
        resolver.reset().await.unwrap();
        assert!(!path.exists());

        let mapping = resolver.resolve().await.unwrap();
        assert_eq!(mapping.metadata.as_ref().unwrap().sample_size, 2);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }
}
