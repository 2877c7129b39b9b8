//! FILENAME: pivot-aggregator/src/engine.rs
//! Pivot Engine - turns records and a configuration into a `PivotResult`.
//!
//! Algorithm:
//! 1. Normalize the configuration (drop unusable measures, collect warnings)
//! 2. Group every record into (row group, column group) cells in one pass
//! 3. Sort row and column groups independently
//! 4. Emit headers and one row per row group, finalizing every cell
//! 5. Turn per-measure diagnostics into data warnings

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::aggregate::{Accumulator, ValueSummary};
use crate::definition::{NormalizedConfig, PivotConfig, PivotOptions, ValueDescriptor};
use crate::error::PivotWarning;
use crate::grouping::{GroupKey, GroupedData};
use crate::value::PivotRecord;
use crate::view::{ColumnHeader, MeasureDiagnostics, PivotCellValue, PivotMeta, PivotResult};

/// Joins the parts of a multi-field column group label.
const LABEL_PART_SEPARATOR: &str = " / ";

/// Joins a column group label with a measure label in a header.
const HEADER_SEPARATOR: &str = " · ";

// ============================================================================
// ORDERING
// ============================================================================

/// Unicode-aware case folding for comparisons.
fn casefold(s: &str) -> String {
    if s.is_ascii() {
        s.to_ascii_lowercase()
    } else {
        s.chars().flat_map(char::to_lowercase).collect()
    }
}

/// Primary sort key: accents stripped (NFD minus combining marks), then
/// case-folded.
fn collation_key(s: &str) -> String {
    if s.is_ascii() {
        s.to_ascii_lowercase()
    } else {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect()
    }
}

/// Accent- and case-insensitive comparison. Ties fall back to the case-folded
/// text, then the exact text, so the order is total.
fn compare_parts(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| casefold(a).cmp(&casefold(b)))
        .then_with(|| a.cmp(b))
}

/// Compares two group keys part by part. A missing trailing part reads as "".
pub fn compare_group_keys(a: &GroupKey, b: &GroupKey) -> Ordering {
    let len = a.parts.len().max(b.parts.len());
    (0..len)
        .map(|i| compare_parts(a.part(i), b.part(i)))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a GroupKey>) -> Vec<GroupKey> {
    let mut sorted: Vec<GroupKey> = keys.cloned().collect();
    sorted.sort_by(compare_group_keys);
    sorted
}

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The main calculation engine for pivot tables.
pub struct PivotCalculator<'a, R: PivotRecord> {
    records: &'a [R],
    config: &'a PivotConfig,
    options: &'a PivotOptions,
    warnings: Vec<PivotWarning>,
}

impl<'a, R: PivotRecord> PivotCalculator<'a, R> {
    pub fn new(records: &'a [R], config: &'a PivotConfig, options: &'a PivotOptions) -> Self {
        PivotCalculator {
            records,
            config,
            options,
            warnings: Vec::new(),
        }
    }

    /// Executes the full calculation and returns the result.
    pub fn calculate(mut self) -> PivotResult {
        // Step 1: Normalize
        let (normalized, config_warnings) = self.config.normalize(self.options);
        self.warnings.extend(config_warnings);

        if normalized.values.is_empty() {
            self.warnings.push(PivotWarning::NoMeasures);
            return self.empty_result(&normalized);
        }

        if self.records.is_empty() {
            self.warnings.push(PivotWarning::NoRows { scope: normalized.scope.clone() });
        }

        // Step 2: Group
        let grouped = GroupedData::build(self.records, &normalized, &self.options.empty_placeholder);

        // Step 3: Sort
        let row_keys = sorted_keys(grouped.rows.keys());
        let col_keys = sorted_keys(grouped.columns.iter());

        // Step 4: Assemble
        let mut result = self.assemble(&normalized, &grouped, &row_keys, &col_keys);

        log::debug!(
            "pivot computed: {} rows x {} column groups x {} measures from {} records, {} warnings",
            result.meta.row_group_count,
            result.meta.column_group_count,
            result.meta.value_count,
            result.meta.source_row_count,
            self.warnings.len()
        );

        result.warnings = self.warnings;
        result
    }

    /// The result returned when no usable measure is configured.
    fn empty_result(self, normalized: &NormalizedConfig) -> PivotResult {
        log::debug!("pivot skipped: no usable measures");
        PivotResult {
            headers: self.row_titles(normalized),
            meta: PivotMeta {
                source_row_count: self.records.len(),
                ..PivotMeta::default()
            },
            warnings: self.warnings,
            ..PivotResult::default()
        }
    }

    fn row_titles(&self, normalized: &NormalizedConfig) -> Vec<String> {
        normalized
            .row_fields
            .iter()
            .map(|field| self.options.column_title(field).to_string())
            .collect()
    }

    fn column_label(&self, key: &GroupKey) -> String {
        if key.is_total() {
            self.options.total_label.clone()
        } else {
            key.parts.join(LABEL_PART_SEPARATOR)
        }
    }

    fn assemble(
        &mut self,
        normalized: &NormalizedConfig,
        grouped: &GroupedData,
        row_keys: &[GroupKey],
        col_keys: &[GroupKey],
    ) -> PivotResult {
        let values = &normalized.values;

        // Headers
        let column_headers: Vec<ColumnHeader> = col_keys
            .iter()
            .map(|key| ColumnHeader {
                key: key.to_key_string(),
                label: self.column_label(key),
                parts: key.parts.to_vec(),
            })
            .collect();

        let mut headers = self.row_titles(normalized);
        for column in &column_headers {
            for descriptor in values {
                headers.push(format!("{}{}{}", column.label, HEADER_SEPARATOR, descriptor.label));
            }
        }

        // Data rows
        let empty_cell: Vec<Accumulator> = values.iter().map(|d| Accumulator::new(d.aggregator)).collect();
        let mut totals = vec![ValueSummary::default(); values.len()];
        let mut rows = Vec::with_capacity(row_keys.len());

        for row_key in row_keys {
            let mut cells: Vec<PivotCellValue> =
                Vec::with_capacity(row_key.parts.len() + col_keys.len() * values.len());
            cells.extend(row_key.parts.iter().cloned().map(PivotCellValue::Text));

            for col_key in col_keys {
                let cell = grouped.cell(row_key, col_key).unwrap_or(&empty_cell);
                for (value_idx, accumulator) in cell.iter().enumerate() {
                    let finalized = accumulator.finalize();
                    totals[value_idx].merge(&finalized.summary);
                    cells.push(finalized.value);
                }
            }

            rows.push(cells);
        }

        // Data warnings
        self.collect_data_warnings(values, &totals);

        let diagnostics = values
            .iter()
            .zip(&totals)
            .map(|(d, summary)| MeasureDiagnostics {
                column: d.column.clone(),
                aggregator: d.aggregator,
                label: d.label.clone(),
                summary: *summary,
            })
            .collect();

        PivotResult {
            headers,
            rows,
            row_keys: row_keys.iter().map(|k| k.parts.to_vec()).collect(),
            column_keys: col_keys.iter().map(|k| k.parts.to_vec()).collect(),
            column_headers,
            value_descriptors: values.clone(),
            meta: PivotMeta {
                row_group_count: row_keys.len(),
                column_group_count: col_keys.len(),
                source_row_count: self.records.len(),
                value_count: values.len(),
            },
            warnings: Vec::new(),
            diagnostics,
        }
    }

    fn collect_data_warnings(&mut self, values: &[ValueDescriptor], totals: &[ValueSummary]) {
        for (descriptor, summary) in values.iter().zip(totals) {
            if summary.invalid_count > 0 {
                self.warnings.push(PivotWarning::InvalidValues {
                    label: descriptor.label.clone(),
                    count: summary.invalid_count,
                });
            }
            if descriptor.aggregator.requires_numeric()
                && summary.valid_count == 0
                && !self.records.is_empty()
            {
                self.warnings.push(PivotWarning::NoNumericValues {
                    label: descriptor.label.clone(),
                });
            }
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Computes a pivot table from `records`.
/// This is the main entry point for the calculation engine; it never panics
/// and reports every problem as a warning on the result.
pub fn compute_pivot_table<R: PivotRecord>(
    records: &[R],
    config: &PivotConfig,
    options: &PivotOptions,
) -> PivotResult {
    PivotCalculator::new(records, config, options).calculate()
}
