pub mod date;
mod record;

pub use record::{is_valid_value, valid, Record, Sex};

use anyhow::{Context, Result};
use geojson::JsonObject;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Where the store is in its one-shot load
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Loaded,
    Failed(String),
}

/// Immutable-per-load table of specimen records
#[derive(Clone, Debug)]
pub struct RecordStore {
    records: Vec<Arc<Record>>,
    state: LoadState,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl RecordStore {
    /// A store that has not been loaded yet
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            state: LoadState::Empty,
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
            state: LoadState::Loaded,
        }
    }

    /// Load a JSON record file. A failed load leaves an empty store in
    /// `LoadState::Failed` rather than returning an error.
    pub fn load(path: &Path) -> Self {
        match load_records(path) {
            Ok(records) => {
                info!("Loaded {} records from {}", records.len(), path.display());
                Self::from_records(records)
            }
            Err(e) => {
                warn!("Failed to load records from {}: {:#}", path.display(), e);
                Self {
                    records: Vec::new(),
                    state: LoadState::Failed(format!("{e:#}")),
                }
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// All records, or nothing when the store never loaded
    pub fn records(&self) -> &[Arc<Record>] {
        if self.is_loaded() {
            &self.records
        } else {
            &[]
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Read a JSON array of flat record objects
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_records(&mut bytes)
}

/// Parse record objects from a JSON buffer (modified in place by the SIMD parser)
pub fn parse_records(bytes: &mut [u8]) -> Result<Vec<Record>> {
    let raw: Vec<JsonObject> =
        simd_json::serde::from_slice(bytes).context("record file is not a JSON array of objects")?;

    let total = raw.len();
    let records: Vec<Record> = raw.into_iter().filter_map(Record::from_json).collect();

    let skipped = total - records.len();
    if skipped > 0 {
        warn!("Skipped {} of {} records without usable coordinates", skipped, total);
    }

    Ok(records)
}
