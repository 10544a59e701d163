//
// lib.rs
// recdiff
//
// Library entry: the structural record diff engine (shapes, key selection, classification) plus the loading and reporting helpers used by the binary.
//
// Thales Matheus Mendonça Santos - November 2025
//
// Public crate interface: re-export modules used by the binary and tests.
pub mod changes;
pub mod cli;
pub mod compare;
pub mod diff;
pub mod error;
pub mod keys;
pub mod loader;
pub mod logging;
pub mod record;
pub mod report;
pub mod shape;
pub mod utils;

pub use changes::{compute_changes, ChangeSet, ValueChange};
pub use cli::{build_options, Args, Options};
pub use compare::{analyze_side, compare, Comparison};
pub use diff::{diff, ComparisonResult, DiffOptions, Entry, ModifiedEntry, ShapeChangePolicy};
pub use error::{DiffError, Result, Side, Warning, WarningKind};
pub use keys::{
    missing_key_selections, resolve_keys, suggest_keys, validate_key_selection, KeyMapping,
};
pub use loader::load_collection;
pub use record::Record;
pub use report::Counters;
pub use shape::{analyze_shapes, Shape, ShapeAnalysis};
