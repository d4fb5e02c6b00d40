//! Sequence-level evaluation.
//!
//! This module turns per-frame associations into per-identity coverage
//! timelines and summary metrics:
//!
//! - `EvaluationConfig` - IoU threshold and classification ratios
//! - `Evaluator` - frame-ordered accumulation of coverage
//! - `Evaluation` - finalized coverage, classifications and report
//! - `MetricsReport` - MT/ML/PT, TP/FN/FP and rates

mod config;
mod coverage;
mod evaluator;
mod report;

pub use config::EvaluationConfig;
pub use coverage::{CoverageRecord, TrackClass, ABSENT};
pub use evaluator::{evaluate, Evaluation, Evaluator};
pub use report::MetricsReport;
