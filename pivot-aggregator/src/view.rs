//! FILENAME: pivot-aggregator/src/view.rs
//! Pivot View - Renderable output for the caller.
//!
//! The result is a flat table (headers + rows) plus the ordered group keys,
//! resolved measures, summary counts and warnings. It serializes with
//! camelCase keys; cell values serialize as plain JSON scalars.

use serde::{Deserialize, Serialize};

use crate::aggregate::ValueSummary;
use crate::definition::{AggregationType, ValueDescriptor};
use crate::error::PivotWarning;
use crate::value::{format_date, RawValue};

// ============================================================================
// CELL VALUES
// ============================================================================

/// Display value for a pivot cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PivotCellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl From<&RawValue> for PivotCellValue {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Empty => PivotCellValue::Empty,
            RawValue::Number(n) if n.is_nan() => PivotCellValue::Empty,
            RawValue::Number(n) => PivotCellValue::Number(*n),
            RawValue::Text(s) | RawValue::Other(s) => PivotCellValue::Text(s.clone()),
            RawValue::Boolean(b) => PivotCellValue::Boolean(*b),
            RawValue::Date(d) => PivotCellValue::Text(format_date(d)),
        }
    }
}

impl From<f64> for PivotCellValue {
    fn from(value: f64) -> Self {
        PivotCellValue::Number(value)
    }
}

impl PivotCellValue {
    pub fn text(s: impl Into<String>) -> Self {
        PivotCellValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PivotCellValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PivotCellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// ============================================================================
// HEADERS AND METADATA
// ============================================================================

/// One column group as shown in the header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHeader {
    /// Stable string identity of the group (parts joined by `KEY_SEPARATOR`).
    pub key: String,
    /// Display label: parts joined by " / ", or the total label.
    pub label: String,
    pub parts: Vec<String>,
}

/// Summary counts of a pivot result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotMeta {
    pub row_group_count: usize,
    pub column_group_count: usize,
    pub source_row_count: usize,
    pub value_count: usize,
}

/// Input classification totals for one measure across the whole matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureDiagnostics {
    pub column: String,
    pub aggregator: AggregationType,
    pub label: String,
    #[serde(flatten)]
    pub summary: ValueSummary,
}

// ============================================================================
// RESULT
// ============================================================================

/// The complete output of one pivot calculation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResult {
    /// Row field titles, then one header per (column group x measure).
    pub headers: Vec<String>,

    /// One row per row group: key cells, then measure cells.
    pub rows: Vec<Vec<PivotCellValue>>,

    /// Formatted parts of every row group, in output order.
    pub row_keys: Vec<Vec<String>>,

    /// Formatted parts of every column group, in output order.
    pub column_keys: Vec<Vec<String>>,

    pub column_headers: Vec<ColumnHeader>,

    pub value_descriptors: Vec<ValueDescriptor>,

    pub meta: PivotMeta,

    pub warnings: Vec<PivotWarning>,

    pub diagnostics: Vec<MeasureDiagnostics>,
}

impl PivotResult {
    /// Warnings as display strings.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Index of the row whose group parts equal `parts`.
    pub fn row_index_of(&self, parts: &[&str]) -> Option<usize> {
        self.row_keys
            .iter()
            .position(|key| key.iter().map(String::as_str).eq(parts.iter().copied()))
    }

    /// Index of the column group whose parts equal `parts`.
    pub fn column_index_of(&self, parts: &[&str]) -> Option<usize> {
        self.column_keys
            .iter()
            .position(|key| key.iter().map(String::as_str).eq(parts.iter().copied()))
    }

    /// The measure cell at (row, column group, measure).
    pub fn measure_value(&self, row: usize, column: usize, value: usize) -> Option<&PivotCellValue> {
        let value_count = self.meta.value_count;
        if column >= self.meta.column_group_count || value >= value_count {
            return None;
        }
        let cells = self.rows.get(row)?;
        let key_width = cells.len().checked_sub(self.meta.column_group_count * value_count)?;
        cells.get(key_width + column * value_count + value)
    }
}
