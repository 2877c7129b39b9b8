//! FILENAME: pivot-aggregator/src/error.rs
//! Warning taxonomy for pivot calculations.
//!
//! The engine never fails: every unusable input degrades into one of these
//! warnings plus a (possibly empty) result.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::definition::PivotScope;

/// Returned when an aggregator name does not match any supported kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported aggregator \"{0}\"")]
pub struct ParseAggregationError(pub String);

/// A non-fatal problem found while computing a pivot table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PivotWarning {
    // Configuration
    #[error("A measure without a selected column was ignored.")]
    MissingValueColumn,

    #[error("Unsupported aggregator \"{aggregator}\" for column \"{column}\" was ignored.")]
    UnsupportedAggregator { aggregator: String, column: String },

    // Degenerate input
    #[error("Configure at least one value field (measure) to compute the pivot table.")]
    NoMeasures,

    #[error("No rows are available for the current scope ({scope}).")]
    NoRows { scope: PivotScope },

    // Data
    #[error("{label}: {count} value(s) could not be read as numbers and were ignored.")]
    InvalidValues { label: String, count: u64 },

    #[error("{label}: no numeric values are available.")]
    NoNumericValues { label: String },
}

impl Serialize for PivotWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
