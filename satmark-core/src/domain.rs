//! Persisted schemas for findings records, rule evaluations, and combined
//! reports.
//!
//! Field names are part of the on-disk format and are consumed by external
//! tooling, hence the PascalCase renames.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::grade::{Grade, OverallGrade};

/// Raw analyzer output for one project. The finding records themselves are
/// opaque; only their count is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsFile {
    /// Opaque finding records as emitted by the analyzer.
    pub results: Vec<serde_json::Value>,
}

impl FindingsFile {
    /// Number of findings reported for the project.
    pub fn count(&self) -> usize {
        self.results.len()
    }
}

/// Score for one (project, rule) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SingleProjectResult {
    /// Directory name of the project.
    pub project_name: String,
    /// Number of findings the analyzer reported.
    pub findings: usize,
    /// Lines of code in the declared language.
    pub lines_of_code: usize,
    /// Findings divided by lines of code; +Inf when the project has
    /// findings but no counted code.
    #[serde(deserialize_with = "deserialize_ratio")]
    pub ratio: f64,
    /// Percentile rank among all projects of the rule, 0 to 100.
    pub percentile: f64,
    /// Bucket grade derived from the percentile.
    pub grade: Grade,
}

impl SingleProjectResult {
    /// Build a result from raw counts. Percentile and grade hold
    /// placeholder values until the grader assigns them.
    pub fn new(project_name: String, findings: usize, lines_of_code: usize) -> Self {
        Self {
            project_name,
            findings,
            lines_of_code,
            ratio: findings as f64 / lines_of_code as f64,
            percentile: 0.0,
            grade: Grade::F,
        }
    }
}

// serde_json renders non-finite floats as null; restore +Inf on the way in
// so persisted evaluations with zero-LOC projects stay readable.
fn deserialize_ratio<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// One rule's evaluation across a corpus, persisted as `_sat_results.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleEvaluation {
    /// Sum of findings across all scored projects.
    pub total_findings: usize,
    /// Number of projects that produced a score.
    pub total_projects: usize,
    /// Per-project scores.
    pub project_findings: Vec<SingleProjectResult>,
}

impl RuleEvaluation {
    /// Fold one project score into the evaluation.
    pub fn add(&mut self, result: SingleProjectResult) {
        self.total_findings += result.findings;
        self.total_projects += 1;
        self.project_findings.push(result);
    }
}

/// Descriptive ratio snapshots at the grade boundaries of one rule's run,
/// persisted as `_grade_thresholds.json`. The authoritative boundaries are
/// the percentile buckets; these are read off the sorted distribution for
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    /// Ratio at the 10th-percentile offset.
    #[serde(rename = "A_plus")]
    pub a_plus: f64,
    /// Ratio at the 20th-percentile offset.
    #[serde(rename = "A")]
    pub a: f64,
    /// Ratio at the 40th-percentile offset.
    #[serde(rename = "B")]
    pub b: f64,
    /// Ratio at the 60th-percentile offset.
    #[serde(rename = "C")]
    pub c: f64,
    /// Ratio at the 80th-percentile offset.
    #[serde(rename = "D")]
    pub d: f64,
    /// Ratio at the 90th-percentile offset.
    #[serde(rename = "F")]
    pub f: f64,
}

/// One rule to include in a combined report, with its severity weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestInfo {
    /// Name of the rule; its evaluation file must exist in the results
    /// directory.
    pub rule_name: String,
    /// Integer weight applied to the rule's grade.
    pub severity: u32,
}

/// Weighted multi-rule outcome for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CombinedResult {
    /// Directory name of the project.
    pub project_name: String,
    /// Grade per rule; rules without a recorded result default to A+.
    pub individual_grades: BTreeMap<String, Grade>,
    /// Letter grade of the weighted average, or `N/A` for zero weight.
    pub overall_grade: OverallGrade,
    /// Severity-weighted mean of the numeric grade scores.
    pub average_score: f64,
}
