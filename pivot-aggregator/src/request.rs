//! FILENAME: pivot-aggregator/src/request.rs
//! A self-contained pivot request, for callers that talk JSON.

use serde::{Deserialize, Serialize};

use crate::definition::{PivotConfig, PivotOptions};
use crate::engine::compute_pivot_table;
use crate::value::Record;
use crate::view::PivotResult;

/// Records, configuration and options of one calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotRequest {
    pub records: Vec<Record>,
    pub config: PivotConfig,
    pub options: PivotOptions,
}

impl PivotRequest {
    /// Parses a request. Only malformed JSON fails; unusable configuration
    /// is reported as warnings by `compute`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn compute(&self) -> PivotResult {
        compute_pivot_table(&self.records, &self.config, &self.options)
    }

    pub fn compute_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.compute())
    }
}
