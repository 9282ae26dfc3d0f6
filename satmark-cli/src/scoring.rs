//! Findings-to-LOC scoring and persistence of the rule evaluation report.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use satmark_core::{
    FindingsFile, LanguageType, LocInspector, RuleEvaluation, SingleProjectResult, StdFileSystem,
    grade_evaluation, resolve_language, sort_for_report,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{CliResult, worker_count};

/// Per-rule evaluation report written into the output root.
pub(crate) const RESULTS_FILE: &str = "_sat_results.json";
/// Grade-boundary snapshot written alongside the evaluation report.
pub(crate) const THRESHOLDS_FILE: &str = "_grade_thresholds.json";

/// Score every findings record in the output root against the corpus, grade
/// the distribution, and persist the evaluation and threshold reports.
pub(crate) async fn score_rule(targets: &Path, out: &Path, language: &str) -> CliResult<()> {
    let language = resolve_language(language)
        .ok_or_else(|| format!("unknown language identifier: {language}"))?;

    let files = findings_records(out).await?;
    let mut evaluation = collect_results(targets, language, files).await?;
    if evaluation.total_projects == 0 {
        return Err("no findings records found to score".into());
    }
    if evaluation
        .project_findings
        .iter()
        .all(|project| project.lines_of_code == 0)
    {
        return Err(format!(
            "no {} code found anywhere in the corpus; check the language identifier",
            language.name()
        )
        .into());
    }

    let thresholds = grade_evaluation(&mut evaluation)?;
    sort_for_report(&mut evaluation);

    let results_path = out.join(RESULTS_FILE);
    tokio::fs::write(&results_path, serde_json::to_string(&evaluation)?).await?;

    let thresholds_path = out.join(THRESHOLDS_FILE);
    match serde_json::to_string_pretty(&thresholds) {
        Ok(json) => match tokio::fs::write(&thresholds_path, json).await {
            Ok(()) => println!("Grade thresholds written to {}", thresholds_path.display()),
            Err(error) => eprintln!("Warning: failed to write grade thresholds: {error}"),
        },
        Err(error) => eprintln!("Warning: failed to write grade thresholds: {error}"),
    }

    println!("Results written");
    Ok(())
}

/// Score the findings records on a semaphore-bounded pool. A record that
/// cannot be read or parsed is logged and dropped; the rest of the batch
/// continues.
async fn collect_results(
    targets: &Path,
    language: LanguageType,
    files: Vec<PathBuf>,
) -> CliResult<RuleEvaluation> {
    let total = files.len();
    let processed = Arc::new(AtomicUsize::new(0));
    let semaphore = Arc::new(Semaphore::new(worker_count()));
    let mut tasks: JoinSet<Option<SingleProjectResult>> = JoinSet::new();

    for file in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let targets = targets.to_path_buf();
        let processed = processed.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let result = score_record(&targets, &file, language).await;
            let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
            print!("\rProgress: {done}/{total} files processed");
            let _ = std::io::stdout().flush();
            match result {
                Ok(result) => Some(result),
                Err(error) => {
                    eprintln!("\nSkipping {}: {error}", file.display());
                    None
                }
            }
        });
    }

    let mut evaluation = RuleEvaluation::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(result)) => evaluation.add(result),
            Ok(None) => {}
            Err(error) => eprintln!("\nScoring task failed: {error}"),
        }
    }

    println!("\nTotal projects analyzed: {}", evaluation.total_projects);
    Ok(evaluation)
}

async fn score_record(
    targets: &Path,
    file: &Path,
    language: LanguageType,
) -> CliResult<SingleProjectResult> {
    let contents = tokio::fs::read_to_string(file).await?;
    let findings = serde_json::from_str::<FindingsFile>(&contents)?.count();
    let project = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| format!("record {} has no project name", file.display()))?
        .to_string();

    let inspector = LocInspector::new(StdFileSystem::new());
    let lines_of_code = inspector.lines_of_code(&targets.join(&project), language)?;

    Ok(SingleProjectResult::new(project, findings, lines_of_code))
}

/// Findings records in the output root: `.json` files, report files (which
/// carry a `_` prefix) excluded, in sorted order.
async fn findings_records(out: &Path) -> CliResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(out).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('_') || !name.ends_with(".json") {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}
