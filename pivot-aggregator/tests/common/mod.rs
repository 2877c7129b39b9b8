//! FILENAME: tests/common/mod.rs
//! Fixtures shared by the pivot integration tests.

#![allow(dead_code)]

use pivot_aggregator::{AggregationType, PivotConfig, RawValue, Record, ValueFieldConfig};

/// Builds a record from (field, value) pairs.
pub fn record(pairs: &[(&str, RawValue)]) -> Record {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn config(rows: &[&str], cols: &[&str], values: &[(&str, AggregationType)]) -> PivotConfig {
    PivotConfig {
        row_fields: rows.iter().map(|s| s.to_string()).collect(),
        column_fields: cols.iter().map(|s| s.to_string()).collect(),
        values: values
            .iter()
            .map(|(column, kind)| ValueFieldConfig::new(*column, *kind))
            .collect(),
        ..PivotConfig::default()
    }
}

/// Sales sample: (region, product, quarter, sales, quantity).
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["region", "product", "quarter", "sales", "quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, RawValue, RawValue)> {
        vec![
            ("North", "Apples", "Q1", 100.0.into(), 10.0.into()),
            ("North", "Oranges", "Q1", 150.0.into(), 15.0.into()),
            ("north", "Apples", "Q2", 120.0.into(), RawValue::text("12")),
            ("South", "Apples", "Q1", 200.0.into(), 20.0.into()),
            ("South", "Oranges", "Q2", RawValue::text("250,5"), 25.0.into()),
            ("South", "Pears", "Q2", RawValue::text("n/a"), RawValue::Empty),
            ("East", "Pears", "Q1", 80.0.into(), 8.0.into()),
            ("East", "Apples", "Q2", RawValue::Empty, 4.0.into()),
            ("West", "Oranges", "Q1", 60.0.into(), 6.0.into()),
            ("", "Pears", "Q2", 30.0.into(), 3.0.into()),
        ]
    }

    pub fn records() -> Vec<Record> {
        Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                record(&[
                    ("region", region.into()),
                    ("product", product.into()),
                    ("quarter", quarter.into()),
                    ("sales", sales),
                    ("quantity", quantity),
                ])
            })
            .collect()
    }
}
