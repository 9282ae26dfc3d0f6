//! Percentile ranking and grade assignment for one rule's evaluation.

use crate::domain::{GradeThresholds, RuleEvaluation};
use crate::error::{Result, SatmarkError};
use crate::grade::Grade;

/// Fractional offsets into the sorted ratio distribution at which the
/// descriptive grade thresholds are read.
const THRESHOLD_OFFSETS: [f64; 6] = [0.1, 0.2, 0.4, 0.6, 0.8, 0.9];

/// Assign percentile ranks and grades to every project of the evaluation,
/// in place, and derive the descriptive grade thresholds.
///
/// Projects are ordered by ascending ratio with a stable sort, so ties keep
/// their insertion order. The percentile of the project at 0-indexed rank
/// `i` among `n` projects is `i / (n - 1) * 100`; distributions with fewer
/// than two projects have no defined percentile and are rejected.
pub fn grade_evaluation(evaluation: &mut RuleEvaluation) -> Result<GradeThresholds> {
    let projects = &mut evaluation.project_findings;
    let total = projects.len();
    if total <= 1 {
        return Err(SatmarkError::InsufficientProjects(total));
    }

    projects.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));

    let mut boundaries = [0.0; 6];
    for (slot, offset) in boundaries.iter_mut().zip(THRESHOLD_OFFSETS) {
        *slot = projects[(total as f64 * offset) as usize].ratio;
    }
    let [a_plus, a, b, c, d, f] = boundaries;
    let thresholds = GradeThresholds {
        a_plus,
        a,
        b,
        c,
        d,
        f,
    };

    for (rank, project) in projects.iter_mut().enumerate() {
        project.percentile = rank as f64 / (total - 1) as f64 * 100.0;
        project.grade = Grade::for_percentile(project.percentile);
    }

    Ok(thresholds)
}

/// Re-order an already graded evaluation for the persisted report: best
/// grade first, ascending ratio within a grade.
pub fn sort_for_report(evaluation: &mut RuleEvaluation) {
    evaluation.project_findings.sort_by(|a, b| {
        a.grade
            .rank()
            .cmp(&b.grade.rank())
            .then(a.ratio.total_cmp(&b.ratio))
    });
}
