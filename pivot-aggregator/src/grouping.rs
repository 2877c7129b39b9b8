//! FILENAME: pivot-aggregator/src/grouping.rs
//! Grouping pass - partitions records into row/column groups.
//!
//! A single scan routes every record into a lazily created cell keyed by
//! (row group, column group). Each cell holds one accumulator per measure,
//! in descriptor order.
//!
//! Group keys are structured: a small vector of formatted parts, hashed
//! structurally. Distinct value tuples can never collide.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::aggregate::Accumulator;
use crate::definition::{FieldName, NormalizedConfig, ValueDescriptor};
use crate::value::{format_key_part, PivotRecord};

/// Separator used in the string form of a group key.
pub const KEY_SEPARATOR: char = '\u{1f}';

// ============================================================================
// GROUP KEY
// ============================================================================

/// A unique combination of formatted field values.
/// The empty key is the synthetic Total group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub parts: SmallVec<[String; 4]>,
}

impl GroupKey {
    pub fn new(parts: impl IntoIterator<Item = String>) -> Self {
        GroupKey {
            parts: parts.into_iter().collect(),
        }
    }

    /// Creates the key of the synthetic Total group.
    pub fn total() -> Self {
        GroupKey::default()
    }

    /// Builds the key of `record` over `fields`.
    pub fn from_record<R: PivotRecord>(record: &R, fields: &[FieldName], empty_placeholder: &str) -> Self {
        GroupKey {
            parts: fields
                .iter()
                .map(|field| format_key_part(&record.value_of(field), empty_placeholder))
                .collect(),
        }
    }

    pub fn is_total(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part at `index`, or "" past the end.
    pub fn part(&self, index: usize) -> &str {
        self.parts.get(index).map_or("", String::as_str)
    }

    /// String identity for consumers that need a flat key.
    pub fn to_key_string(&self) -> String {
        let mut key = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(part);
        }
        key
    }
}

// ============================================================================
// GROUPED DATA
// ============================================================================

/// Accumulators of one (row group, column group) intersection.
pub type Cell = Vec<Accumulator>;

/// The populated grouping state after one scan.
#[derive(Debug, Default)]
pub struct GroupedData {
    /// Row group -> column group -> cell.
    pub rows: FxHashMap<GroupKey, FxHashMap<GroupKey, Cell>>,

    /// Every column group seen in any row.
    pub columns: FxHashSet<GroupKey>,
}

fn new_cell(values: &[ValueDescriptor]) -> Cell {
    values.iter().map(|d| Accumulator::new(d.aggregator)).collect()
}

impl GroupedData {
    /// Scans `records` once in order, feeding every measure of every record.
    pub fn build<R: PivotRecord>(records: &[R], config: &NormalizedConfig, empty_placeholder: &str) -> Self {
        let mut grouped = GroupedData::default();

        for record in records {
            let row_key = GroupKey::from_record(record, &config.row_fields, empty_placeholder);
            // No column fields: every record lands in the single Total column.
            let col_key = GroupKey::from_record(record, &config.column_fields, empty_placeholder);

            if !grouped.columns.contains(&col_key) {
                grouped.columns.insert(col_key.clone());
            }

            let cell = grouped
                .rows
                .entry(row_key)
                .or_default()
                .entry(col_key)
                .or_insert_with(|| new_cell(&config.values));

            for (accumulator, descriptor) in cell.iter_mut().zip(&config.values) {
                accumulator.update(&record.value_of(&descriptor.column));
            }
        }

        if grouped.columns.is_empty() {
            grouped.columns.insert(GroupKey::total());
        }
        if grouped.rows.is_empty() && !records.is_empty() {
            grouped.rows.insert(GroupKey::total(), FxHashMap::default());
        }

        log::trace!(
            "grouped {} records into {} row groups x {} column groups",
            records.len(),
            grouped.rows.len(),
            grouped.columns.len()
        );

        grouped
    }

    /// The cell at (row, column), if any record landed there.
    pub fn cell(&self, row: &GroupKey, column: &GroupKey) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationType, PivotScope};
    use crate::value::{RawValue, Record};

    fn record(pairs: &[(&str, RawValue)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn config(rows: &[&str], cols: &[&str]) -> NormalizedConfig {
        NormalizedConfig {
            row_fields: rows.iter().map(|s| s.to_string()).collect(),
            column_fields: cols.iter().map(|s| s.to_string()).collect(),
            values: vec![ValueDescriptor {
                column: "sales".to_string(),
                aggregator: AggregationType::Sum,
                label: "Sales (Sum)".to_string(),
            }],
            scope: PivotScope::default(),
        }
    }

    #[test]
    fn test_keys_are_structural() {
        // "a|b" + "c" must not collide with "a" + "b|c" whatever the separator.
        let a = GroupKey::new(vec![format!("a{}b", KEY_SEPARATOR), "c".to_string()]);
        let b = GroupKey::new(vec!["a".to_string(), format!("b{}c", KEY_SEPARATOR)]);
        assert_ne!(a, b);
        assert_eq!(GroupKey::new(vec!["x".to_string()]), GroupKey::new(vec!["x".to_string()]));
    }

    #[test]
    fn test_missing_fields_use_placeholder() {
        let r = record(&[("region", RawValue::text(" North "))]);
        let key = GroupKey::from_record(&r, &["region".to_string(), "month".to_string()], "–");
        assert_eq!(key.parts.as_slice(), &["North".to_string(), "–".to_string()]);
        assert_eq!(key.part(5), "");
    }

    #[test]
    fn test_build_creates_cells_lazily() {
        let records = vec![
            record(&[("region", "A".into()), ("month", "Jan".into()), ("sales", 10.0.into())]),
            record(&[("region", "A".into()), ("month", "Feb".into()), ("sales", 20.0.into())]),
            record(&[("region", "B".into()), ("month", "Jan".into()), ("sales", 5.0.into())]),
        ];

        let grouped = GroupedData::build(&records, &config(&["region"], &["month"]), "–");

        assert_eq!(grouped.rows.len(), 2);
        assert_eq!(grouped.columns.len(), 2);

        let b = GroupKey::new(vec!["B".to_string()]);
        let feb = GroupKey::new(vec!["Feb".to_string()]);
        assert!(grouped.cell(&b, &feb).is_none());
        assert_eq!(grouped.rows[&b].len(), 1);
    }

    #[test]
    fn test_no_fields_collapse_to_total() {
        let records = vec![
            record(&[("sales", 1.0.into())]),
            record(&[("sales", 2.0.into())]),
        ];

        let grouped = GroupedData::build(&records, &config(&[], &[]), "–");

        assert_eq!(grouped.rows.len(), 1);
        assert!(grouped.rows.contains_key(&GroupKey::total()));
        assert!(grouped.columns.contains(&GroupKey::total()));
        let cell = grouped.cell(&GroupKey::total(), &GroupKey::total()).unwrap();
        assert_eq!(cell[0].summary().valid_count, 2);
    }

    #[test]
    fn test_empty_records_force_total_column() {
        let records: Vec<Record> = Vec::new();
        let grouped = GroupedData::build(&records, &config(&["region"], &["month"]), "–");

        assert!(grouped.rows.is_empty());
        assert_eq!(grouped.columns.len(), 1);
        assert!(grouped.columns.contains(&GroupKey::total()));
    }
}
