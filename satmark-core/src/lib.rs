#![deny(missing_docs)]
//! satmark core library.
//!
//! Domain types, grading math, and lines-of-code normalization for the
//! satmark static-analysis grading pipeline.

pub mod combine;
pub mod domain;
pub mod error;
pub mod fs;
pub mod grade;
pub mod loc;
pub mod percentile;

pub use combine::combine_results;
pub use domain::{
    CombinedResult, FindingsFile, GradeThresholds, RuleEvaluation, SingleProjectResult, TestInfo,
};
pub use error::{Result, SatmarkError};
pub use fs::{FileSystem, StdFileSystem};
pub use grade::{Grade, OverallGrade};
pub use loc::{LocInspector, resolve_language};
pub use percentile::{grade_evaluation, sort_for_report};
pub use tokei::LanguageType;
