//! FILENAME: pivot-aggregator/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot table:
//! - `PivotConfig`: what the caller asked for (may contain junk)
//! - `PivotOptions`: column metadata and display overrides
//! - `NormalizedConfig`: the cleaned configuration every later stage relies on
//!
//! The raw types are serde-friendly so they can cross a JSON bridge unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseAggregationError, PivotWarning};

/// Name of a source field (column key in the record schema).
pub type FieldName = String;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountRows,
    CountValid,
    Median,
    StdDev,
    Variance,
    Product,
    First,
    Last,
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Sum
    }
}

impl AggregationType {
    pub const ALL: [AggregationType; 13] = [
        AggregationType::Sum,
        AggregationType::Average,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::Count,
        AggregationType::CountRows,
        AggregationType::CountValid,
        AggregationType::Median,
        AggregationType::StdDev,
        AggregationType::Variance,
        AggregationType::Product,
        AggregationType::First,
        AggregationType::Last,
    ];

    /// Wire name, as accepted in `ValueFieldConfig::aggregator`.
    pub fn name(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Average => "average",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Count => "count",
            AggregationType::CountRows => "countRows",
            AggregationType::CountValid => "countValid",
            AggregationType::Median => "median",
            AggregationType::StdDev => "stdDev",
            AggregationType::Variance => "variance",
            AggregationType::Product => "product",
            AggregationType::First => "first",
            AggregationType::Last => "last",
        }
    }

    /// Human-readable measure name used in default labels.
    pub fn display_name(self) -> &'static str {
        match self {
            AggregationType::Sum => "Sum",
            AggregationType::Average => "Average",
            AggregationType::Min => "Min",
            AggregationType::Max => "Max",
            AggregationType::Count => "Count",
            AggregationType::CountRows => "Row count",
            AggregationType::CountValid => "Non-empty count",
            AggregationType::Median => "Median",
            AggregationType::StdDev => "Std. deviation",
            AggregationType::Variance => "Variance",
            AggregationType::Product => "Product",
            AggregationType::First => "First",
            AggregationType::Last => "Last",
        }
    }

    /// Whether only numerically coercible values feed the result.
    pub fn requires_numeric(self) -> bool {
        !matches!(
            self,
            AggregationType::CountRows
                | AggregationType::CountValid
                | AggregationType::First
                | AggregationType::Last
        )
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationType {
    type Err = ParseAggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationType::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ParseAggregationError(s.to_string()))
    }
}

// ============================================================================
// SCOPE
// ============================================================================

/// Which upstream view of the dataset the records were taken from ("raw",
/// "transformed", ...). The engine never interprets it beyond reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PivotScope(pub String);

impl PivotScope {
    pub const RAW: &'static str = "raw";

    pub fn new(tag: impl Into<String>) -> Self {
        PivotScope(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PivotScope {
    fn default() -> Self {
        PivotScope::new(Self::RAW)
    }
}

impl fmt::Display for PivotScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// RAW CONFIGURATION
// ============================================================================

/// A requested measure, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueFieldConfig {
    /// Source column the measure reads.
    pub column: FieldName,

    /// Aggregator name: "sum", "average", "countRows", ...
    pub aggregator: String,

    /// Display label (defaults to "<column title> (<measure name>)").
    pub label: Option<String>,
}

impl ValueFieldConfig {
    pub fn new(column: impl Into<String>, aggregation: AggregationType) -> Self {
        ValueFieldConfig {
            column: column.into(),
            aggregator: aggregation.name().to_string(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The pivot configuration as requested by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotConfig {
    /// Fields placed in the Row area (ordered from outer to inner).
    pub row_fields: Vec<FieldName>,

    /// Fields placed in the Column area (ordered from outer to inner).
    pub column_fields: Vec<FieldName>,

    /// Fields placed in the Values area.
    pub values: Vec<ValueFieldConfig>,

    pub scope: PivotScope,
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Display metadata for one source column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMeta {
    pub key: FieldName,
    pub label: Option<String>,
    pub display_name: Option<String>,
    pub name: Option<String>,
}

impl ColumnMeta {
    /// First non-blank of label, display name and name.
    fn title(&self) -> Option<&str> {
        [&self.label, &self.display_name, &self.name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

pub const DEFAULT_EMPTY_PLACEHOLDER: &str = "–";
pub const DEFAULT_TOTAL_LABEL: &str = "Total";

fn default_empty_placeholder() -> String {
    DEFAULT_EMPTY_PLACEHOLDER.to_string()
}

fn default_total_label() -> String {
    DEFAULT_TOTAL_LABEL.to_string()
}

/// Per-call options that affect presentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotOptions {
    /// Column metadata used to resolve header titles.
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,

    /// Group label used for empty values.
    #[serde(default = "default_empty_placeholder")]
    pub empty_placeholder: String,

    /// Label of the synthetic group used when no fields are configured.
    #[serde(default = "default_total_label")]
    pub total_label: String,
}

impl Default for PivotOptions {
    fn default() -> Self {
        PivotOptions {
            columns: Vec::new(),
            empty_placeholder: default_empty_placeholder(),
            total_label: default_total_label(),
        }
    }
}

impl PivotOptions {
    /// Resolves the display title of a field, falling back to its key.
    pub fn column_title<'a>(&'a self, key: &'a str) -> &'a str {
        self.columns
            .iter()
            .find(|c| c.key == key)
            .and_then(ColumnMeta::title)
            .unwrap_or(key)
    }
}

// ============================================================================
// NORMALIZED CONFIGURATION
// ============================================================================

/// A validated measure: source column, aggregation and resolved label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDescriptor {
    pub column: FieldName,
    pub aggregator: AggregationType,
    pub label: String,
}

/// The configuration after cleaning. Every field list is non-blank and every
/// descriptor names a column and a supported aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConfig {
    pub row_fields: Vec<FieldName>,
    pub column_fields: Vec<FieldName>,
    pub values: Vec<ValueDescriptor>,
    pub scope: PivotScope,
}

fn non_blank_fields(fields: &[FieldName]) -> Vec<FieldName> {
    fields.iter().filter(|f| !f.trim().is_empty()).cloned().collect()
}

impl PivotConfig {
    /// Validates the configuration. Malformed measures are dropped, each one
    /// reported by a warning; blank row/column fields are dropped silently.
    pub fn normalize(&self, options: &PivotOptions) -> (NormalizedConfig, Vec<PivotWarning>) {
        let mut warnings = Vec::new();
        let mut values = Vec::with_capacity(self.values.len());

        for requested in &self.values {
            if requested.column.trim().is_empty() {
                log::trace!("dropping measure without column");
                warnings.push(PivotWarning::MissingValueColumn);
                continue;
            }

            let aggregator = match requested.aggregator.parse::<AggregationType>() {
                Ok(kind) => kind,
                Err(ParseAggregationError(name)) => {
                    log::trace!("dropping measure on {}: unknown aggregator {}", requested.column, name);
                    warnings.push(PivotWarning::UnsupportedAggregator {
                        aggregator: name,
                        column: requested.column.clone(),
                    });
                    continue;
                }
            };

            let label = match requested.label.as_deref().map(str::trim) {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => format!(
                    "{} ({})",
                    options.column_title(&requested.column),
                    aggregator.display_name()
                ),
            };

            values.push(ValueDescriptor {
                column: requested.column.clone(),
                aggregator,
                label,
            });
        }

        let normalized = NormalizedConfig {
            row_fields: non_blank_fields(&self.row_fields),
            column_fields: non_blank_fields(&self.column_fields),
            values,
            scope: self.scope.clone(),
        };

        (normalized, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_names_round_trip() {
        for kind in AggregationType::ALL {
            assert_eq!(kind.name().parse::<AggregationType>(), Ok(kind));
        }
        assert!("Sum".parse::<AggregationType>().is_err());
        assert!("mode".parse::<AggregationType>().is_err());
    }

    #[test]
    fn test_requires_numeric() {
        assert!(AggregationType::Median.requires_numeric());
        assert!(AggregationType::Count.requires_numeric());
        assert!(!AggregationType::CountRows.requires_numeric());
        assert!(!AggregationType::Last.requires_numeric());
    }

    #[test]
    fn test_normalize_drops_blank_fields_silently() {
        let config = PivotConfig {
            row_fields: vec!["region".to_string(), "  ".to_string(), String::new()],
            column_fields: vec![" ".to_string(), "month".to_string()],
            values: vec![ValueFieldConfig::new("sales", AggregationType::Sum)],
            scope: PivotScope::default(),
        };

        let (normalized, warnings) = config.normalize(&PivotOptions::default());

        assert_eq!(normalized.row_fields, vec!["region"]);
        assert_eq!(normalized.column_fields, vec!["month"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_normalize_reports_bad_measures() {
        let config = PivotConfig {
            values: vec![
                ValueFieldConfig::new("  ", AggregationType::Sum),
                ValueFieldConfig {
                    column: "sales".to_string(),
                    aggregator: "mode".to_string(),
                    label: None,
                },
                ValueFieldConfig::new("sales", AggregationType::Average),
            ],
            ..PivotConfig::default()
        };

        let (normalized, warnings) = config.normalize(&PivotOptions::default());

        assert_eq!(normalized.values.len(), 1);
        assert_eq!(normalized.values[0].aggregator, AggregationType::Average);
        assert_eq!(
            warnings,
            vec![
                PivotWarning::MissingValueColumn,
                PivotWarning::UnsupportedAggregator {
                    aggregator: "mode".to_string(),
                    column: "sales".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_default_label_uses_column_title() {
        let options = PivotOptions {
            columns: vec![ColumnMeta {
                key: "sales".to_string(),
                label: Some("  ".to_string()),
                display_name: Some("Net sales".to_string()),
                name: Some("sales_net".to_string()),
            }],
            ..PivotOptions::default()
        };
        let config = PivotConfig {
            values: vec![
                ValueFieldConfig::new("sales", AggregationType::Sum),
                ValueFieldConfig::new("units", AggregationType::CountRows),
                ValueFieldConfig::new("sales", AggregationType::Max).with_label("Peak"),
            ],
            ..PivotConfig::default()
        };

        let (normalized, _) = config.normalize(&options);

        assert_eq!(normalized.values[0].label, "Net sales (Sum)");
        assert_eq!(normalized.values[1].label, "units (Row count)");
        assert_eq!(normalized.values[2].label, "Peak");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PivotConfig = serde_json::from_str(
            r#"{ "rowFields": ["region"], "values": [{ "column": "sales", "aggregator": "sum" }] }"#,
        )
        .unwrap();

        assert_eq!(config.row_fields, vec!["region"]);
        assert!(config.column_fields.is_empty());
        assert_eq!(config.scope.as_str(), "raw");
        assert_eq!(config.values[0].label, None);

        let config: PivotConfig = serde_json::from_str(r#"{ "scope": "filtered" }"#).unwrap();
        assert_eq!(config.scope, PivotScope::new("filtered"));

        let options: PivotOptions = serde_json::from_str(r#"{ "totalLabel": "Gesamt" }"#).unwrap();
        assert_eq!(options.total_label, "Gesamt");
        assert_eq!(options.empty_placeholder, DEFAULT_EMPTY_PLACEHOLDER);
    }
}
