//! FILENAME: pivot-aggregator/src/aggregate.rs
//! Aggregate accumulators - one streaming reducer per measure and cell.
//!
//! Each `Accumulator` holds the small state its aggregation kind needs plus a
//! `ValueSummary` of how many inputs were valid, invalid or empty. The kind
//! set is closed: adding a kind means adding a state variant.

use serde::{Deserialize, Serialize};

use crate::definition::AggregationType;
use crate::value::{coerce_number, Coerced, RawValue};
use crate::view::PivotCellValue;

/// Variance values in this open interval below zero are rounding noise.
const VARIANCE_EPSILON: f64 = 1e-12;

// ============================================================================
// VALUE SUMMARY
// ============================================================================

/// Diagnostic counts of the inputs an accumulator has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSummary {
    pub valid_count: u64,
    pub invalid_count: u64,
    pub empty_count: u64,
}

impl ValueSummary {
    pub fn merge(&mut self, other: &ValueSummary) {
        self.valid_count += other.valid_count;
        self.invalid_count += other.invalid_count;
        self.empty_count += other.empty_count;
    }

    pub fn total(&self) -> u64 {
        self.valid_count + self.invalid_count + self.empty_count
    }
}

// ============================================================================
// ACCUMULATOR STATE
// ============================================================================

/// Running mean and sum of squared deviations (Welford's algorithm).
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Sample variance (n - 1 denominator). `None` for fewer than two values.
    fn sample_variance(&self) -> Option<f64> {
        if self.count <= 1 {
            return None;
        }
        let variance = self.m2 / ((self.count - 1) as f64);
        if variance < 0.0 && variance > -VARIANCE_EPSILON {
            Some(0.0)
        } else {
            Some(variance)
        }
    }
}

#[derive(Debug, Clone)]
enum AccumulatorState {
    Sum { total: f64 },
    Average { total: f64 },
    Min(Option<f64>),
    Max(Option<f64>),
    Count,
    CountRows { rows: u64 },
    CountValid,
    Median { values: Vec<f64> },
    StdDev(Moments),
    Variance(Moments),
    Product { product: f64 },
    First(Option<RawValue>),
    Last(Option<RawValue>),
}

impl AccumulatorState {
    fn new(kind: AggregationType) -> Self {
        match kind {
            AggregationType::Sum => AccumulatorState::Sum { total: 0.0 },
            AggregationType::Average => AccumulatorState::Average { total: 0.0 },
            AggregationType::Min => AccumulatorState::Min(None),
            AggregationType::Max => AccumulatorState::Max(None),
            AggregationType::Count => AccumulatorState::Count,
            AggregationType::CountRows => AccumulatorState::CountRows { rows: 0 },
            AggregationType::CountValid => AccumulatorState::CountValid,
            AggregationType::Median => AccumulatorState::Median { values: Vec::new() },
            AggregationType::StdDev => AccumulatorState::StdDev(Moments::default()),
            AggregationType::Variance => AccumulatorState::Variance(Moments::default()),
            AggregationType::Product => AccumulatorState::Product { product: 1.0 },
            AggregationType::First => AccumulatorState::First(None),
            AggregationType::Last => AccumulatorState::Last(None),
        }
    }

    /// Feeds one valid number into a numeric state.
    fn add_number(&mut self, value: f64) {
        match self {
            AccumulatorState::Sum { total } | AccumulatorState::Average { total } => *total += value,
            AccumulatorState::Min(min) => *min = Some(min.map_or(value, |m| m.min(value))),
            AccumulatorState::Max(max) => *max = Some(max.map_or(value, |m| m.max(value))),
            AccumulatorState::Median { values } => values.push(value),
            AccumulatorState::StdDev(moments) | AccumulatorState::Variance(moments) => moments.add(value),
            AccumulatorState::Product { product } => *product *= value,
            AccumulatorState::Count
            | AccumulatorState::CountRows { .. }
            | AccumulatorState::CountValid
            | AccumulatorState::First(_)
            | AccumulatorState::Last(_) => {}
        }
    }

    /// Feeds one raw value into a state that does not need numbers.
    fn add_raw(&mut self, value: &RawValue, is_empty: bool) {
        match self {
            AccumulatorState::CountRows { rows } => *rows += 1,
            AccumulatorState::First(first) => {
                if first.is_none() && !is_empty {
                    *first = Some(value.clone());
                }
            }
            AccumulatorState::Last(last) => {
                if !is_empty {
                    *last = Some(value.clone());
                }
            }
            _ => {}
        }
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// The finalized outcome of one accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub value: PivotCellValue,
    pub summary: ValueSummary,
}

/// Streaming reducer for one measure in one pivot cell.
#[derive(Debug, Clone)]
pub struct Accumulator {
    kind: AggregationType,
    state: AccumulatorState,
    summary: ValueSummary,
}

impl Accumulator {
    pub fn new(kind: AggregationType) -> Self {
        Accumulator {
            kind,
            state: AccumulatorState::new(kind),
            summary: ValueSummary::default(),
        }
    }

    pub fn kind(&self) -> AggregationType {
        self.kind
    }

    pub fn summary(&self) -> &ValueSummary {
        &self.summary
    }

    /// Adds one contributing record's raw value.
    pub fn update(&mut self, value: &RawValue) {
        if self.kind.requires_numeric() {
            match coerce_number(value) {
                Coerced::Valid(n) => {
                    self.summary.valid_count += 1;
                    self.state.add_number(n);
                }
                Coerced::Invalid => self.summary.invalid_count += 1,
                Coerced::Empty => self.summary.empty_count += 1,
            }
        } else {
            let is_empty = value.is_empty();
            if is_empty {
                self.summary.empty_count += 1;
            } else {
                self.summary.valid_count += 1;
            }
            self.state.add_raw(value, is_empty);
        }
    }

    /// Computes the display value. Kinds with no valid input yield `Empty`,
    /// counting kinds yield zero.
    pub fn finalize(&self) -> Finalized {
        let valid = self.summary.valid_count;
        let number = |n: f64| PivotCellValue::Number(n);
        let when_any = |n: f64| if valid > 0 { number(n) } else { PivotCellValue::Empty };

        let value = match &self.state {
            AccumulatorState::Sum { total } => when_any(*total),
            AccumulatorState::Average { total } => {
                if valid > 0 {
                    number(total / valid as f64)
                } else {
                    PivotCellValue::Empty
                }
            }
            AccumulatorState::Min(v) | AccumulatorState::Max(v) => {
                v.map_or(PivotCellValue::Empty, number)
            }
            AccumulatorState::Count | AccumulatorState::CountValid => number(valid as f64),
            AccumulatorState::CountRows { rows } => number(*rows as f64),
            AccumulatorState::Median { values } => median(values).map_or(PivotCellValue::Empty, number),
            AccumulatorState::StdDev(moments) => moments
                .sample_variance()
                .map_or(PivotCellValue::Empty, |v| number(v.sqrt())),
            AccumulatorState::Variance(moments) => {
                moments.sample_variance().map_or(PivotCellValue::Empty, number)
            }
            AccumulatorState::Product { product } => when_any(*product),
            AccumulatorState::First(v) | AccumulatorState::Last(v) => {
                v.as_ref().map_or(PivotCellValue::Empty, PivotCellValue::from)
            }
        };

        Finalized {
            value,
            summary: self.summary,
        }
    }
}
