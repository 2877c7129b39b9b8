//! FILENAME: pivot-aggregator/src/lib.rs
//! Pivot table aggregation engine.
//!
//! Turns a flat collection of records into a cross-tabulated summary grouped
//! by row and column fields, with one or more measures per cell. The engine is
//! a pure function of (records, configuration, options): it performs no I/O,
//! never mutates its input and never fails. Problems surface as warnings.
//!
//! Layers:
//! - `definition`: Serializable configuration and its normalization
//! - `value`: Raw record values, numeric coercion, key formatting
//! - `aggregate`: Streaming accumulators, one per measure and cell
//! - `grouping`: Single-pass partitioning into row/column groups
//! - `view`: Renderable output for the caller
//! - `engine`: Calculation engine (orders, assembles, reports)
//! - `request`: JSON-friendly request bundle

pub mod aggregate;
pub mod definition;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod request;
pub mod value;
pub mod view;

pub use aggregate::{Accumulator, Finalized, ValueSummary};
pub use definition::*;
pub use engine::{compare_group_keys, compute_pivot_table, PivotCalculator};
pub use error::{ParseAggregationError, PivotWarning};
pub use grouping::{GroupKey, GroupedData, KEY_SEPARATOR};
pub use request::PivotRequest;
pub use value::{coerce_number, format_key_part, Coerced, PivotRecord, RawValue, Record};
pub use view::*;
