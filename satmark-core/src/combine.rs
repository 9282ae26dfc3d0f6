//! Severity-weighted aggregation of several rules' evaluations.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{CombinedResult, RuleEvaluation, TestInfo};
use crate::grade::{Grade, OverallGrade};

/// Combine the evaluations of several rules into one weighted result per
/// project, sorted by descending average score.
///
/// The project universe is every name observed across all evaluations; a
/// project missing from one rule's evaluation passed that rule (its record
/// landed under `no_findings`) and defaults to A+. Ties in the average
/// score keep discovery order.
pub fn combine_results(evaluations: &[(TestInfo, RuleEvaluation)]) -> Vec<CombinedResult> {
    let mut seen = HashSet::new();
    let mut universe = Vec::new();
    for (_, evaluation) in evaluations {
        for project in &evaluation.project_findings {
            if seen.insert(project.project_name.clone()) {
                universe.push(project.project_name.clone());
            }
        }
    }

    let mut combined: Vec<CombinedResult> = universe
        .into_iter()
        .map(|project_name| {
            let mut individual_grades = BTreeMap::new();
            for (info, evaluation) in evaluations {
                let grade = evaluation
                    .project_findings
                    .iter()
                    .find(|p| p.project_name == project_name)
                    .map(|p| p.grade)
                    .unwrap_or(Grade::APlus);
                individual_grades.insert(info.rule_name.clone(), grade);
            }
            let (overall_grade, average_score) = weighted_overall(&individual_grades, evaluations);
            CombinedResult {
                project_name,
                individual_grades,
                overall_grade,
                average_score,
            }
        })
        .collect();

    combined.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    combined
}

fn weighted_overall(
    grades: &BTreeMap<String, Grade>,
    evaluations: &[(TestInfo, RuleEvaluation)],
) -> (OverallGrade, f64) {
    let mut total_score = 0.0;
    let mut total_weight = 0u32;
    for (info, _) in evaluations {
        let grade = grades.get(&info.rule_name).copied().unwrap_or(Grade::APlus);
        total_score += (grade.score() * info.severity) as f64;
        total_weight += info.severity;
    }

    if total_weight == 0 {
        return (OverallGrade::NotApplicable, 0.0);
    }

    let average = total_score / total_weight as f64;
    (OverallGrade::Graded(Grade::from_score(average)), average)
}

#[cfg(test)]
mod tests {
    use super::combine_results;
    use crate::domain::{RuleEvaluation, SingleProjectResult, TestInfo};
    use crate::grade::{Grade, OverallGrade};

    fn info(rule_name: &str, severity: u32) -> TestInfo {
        TestInfo {
            rule_name: rule_name.to_string(),
            severity,
        }
    }

    fn evaluation(entries: &[(&str, Grade)]) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::default();
        for (name, grade) in entries {
            let mut result = SingleProjectResult::new(name.to_string(), 1, 100);
            result.grade = *grade;
            evaluation.add(result);
        }
        evaluation
    }

    #[test]
    fn absent_project_defaults_to_a_plus() {
        // B on a severity-1 rule, absent from a severity-2 rule:
        // (4*1 + 6*2) / 3 = 16/3, which maps to grade A.
        let evaluations = vec![
            (info("r1", 1), evaluation(&[("alpha", Grade::B)])),
            (info("r2", 2), evaluation(&[("beta", Grade::C)])),
        ];

        let combined = combine_results(&evaluations);
        let alpha = combined
            .iter()
            .find(|c| c.project_name == "alpha")
            .expect("alpha combined");

        assert_eq!(alpha.individual_grades["r1"], Grade::B);
        assert_eq!(alpha.individual_grades["r2"], Grade::APlus);
        assert!((alpha.average_score - 16.0 / 3.0).abs() < 1e-12);
        assert_eq!(alpha.overall_grade, OverallGrade::Graded(Grade::A));
    }

    #[test]
    fn zero_total_severity_yields_not_applicable() {
        let evaluations = vec![(info("r1", 0), evaluation(&[("alpha", Grade::B)]))];

        let combined = combine_results(&evaluations);

        assert_eq!(combined[0].overall_grade, OverallGrade::NotApplicable);
        assert_eq!(combined[0].average_score, 0.0);
    }

    #[test]
    fn empty_rule_list_produces_no_results() {
        let combined = combine_results(&[]);
        assert!(combined.is_empty());
    }

    #[test]
    fn results_sort_by_descending_average_score() {
        let evaluations = vec![(
            info("r1", 1),
            evaluation(&[("low", Grade::F), ("mid", Grade::C), ("high", Grade::APlus)]),
        )];

        let combined = combine_results(&evaluations);

        let names: Vec<&str> = combined.iter().map(|c| c.project_name.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn tied_scores_keep_discovery_order() {
        let evaluations = vec![(
            info("r1", 1),
            evaluation(&[("first", Grade::C), ("second", Grade::C)]),
        )];

        let combined = combine_results(&evaluations);

        let names: Vec<&str> = combined.iter().map(|c| c.project_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn universe_spans_all_rules() {
        let evaluations = vec![
            (info("r1", 1), evaluation(&[("alpha", Grade::A)])),
            (info("r2", 1), evaluation(&[("beta", Grade::F)])),
        ];

        let combined = combine_results(&evaluations);

        assert_eq!(combined.len(), 2);
        assert!(combined.iter().any(|c| c.project_name == "alpha"));
        assert!(combined.iter().any(|c| c.project_name == "beta"));
    }

    #[test]
    fn weighted_average_respects_severities() {
        // alpha: A (5) on severity 3, F (0) on severity 1 -> 15/4 = 3.75 -> B.
        let evaluations = vec![
            (info("r1", 3), evaluation(&[("alpha", Grade::A)])),
            (info("r2", 1), evaluation(&[("alpha", Grade::F)])),
        ];

        let combined = combine_results(&evaluations);

        assert_eq!(combined[0].average_score, 3.75);
        assert_eq!(combined[0].overall_grade, OverallGrade::Graded(Grade::B));
    }
}
