//! Record sources
//!
//! The inventory API client lives outside this crate; anything that can hand
//! over records implements [`RecordSource`].

use async_trait::async_trait;

use crate::record::SourceRecord;

/// Trait for inventory record sources (inventory API, spreadsheet export, ...)
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Return up to `n` records for field mapping analysis
    async fn sample(&self, n: usize) -> anyhow::Result<Vec<SourceRecord>>;

    /// Human-readable source name
    fn source_name(&self) -> &str;
}

/// Records already loaded in memory, e.g. a parsed spreadsheet upload.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    records: Vec<SourceRecord>,
}

impl MemorySource {
    /// Records without a row index get their position in `records`.
    pub fn new(name: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| if r.row().is_some() { r } else { r.with_row(i) })
            .collect();
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SourceRecord> {
        self.records
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn sample(&self, n: usize) -> anyhow::Result<Vec<SourceRecord>> {
        Ok(self.records.iter().take(n).cloned().collect())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
