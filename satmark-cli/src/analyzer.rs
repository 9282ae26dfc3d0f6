//! Worker pool and external analyzer invocation for rule evaluation.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use satmark_core::FindingsFile;
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::{CliResult, worker_count};

/// Subdirectory of the output root holding zero-finding records.
pub(crate) const NO_FINDINGS_DIR: &str = "no_findings";

const ANALYZER_BIN: &str = "semgrep";
const PROGRESS_POLL: Duration = Duration::from_millis(10);

/// A project whose analysis failed, with the error that stopped it.
pub(crate) struct ProjectFailure {
    pub(crate) project: String,
    pub(crate) error: String,
}

/// Inputs shared by every analyzer invocation of one rule evaluation.
pub(crate) struct RuleRun {
    pub(crate) rules: PathBuf,
    pub(crate) targets: PathBuf,
    pub(crate) out: PathBuf,
    pub(crate) print: bool,
}

/// Analyze every eligible project under the corpus root, sequentially or on
/// a worker pool. Per-project failures are collected and reported after the
/// batch; they never abort the projects still queued.
pub(crate) async fn run_rule(run: RuleRun, parallel: bool) -> CliResult<()> {
    ensure_directory(&run.targets).await?;
    if tokio::fs::metadata(&run.rules).await.is_err() {
        return Err(format!("rule configuration not found: {}", run.rules.display()).into());
    }
    tokio::fs::create_dir_all(run.out.join(NO_FINDINGS_DIR)).await?;

    let all_projects = list_project_dirs(&run.targets).await?;
    let candidates = all_projects.len();
    let existing = existing_record_names(&run.out).await?;
    let projects = filter_new_projects(all_projects, &existing);
    println!(
        "Skipping {} projects with existing results",
        candidates - projects.len()
    );
    println!("Analyzing {} projects...", projects.len());
    if projects.is_empty() {
        return Ok(());
    }

    let failures = if parallel {
        analyze_parallel(Arc::new(run), projects).await
    } else {
        analyze_sequential(&run, &projects).await
    };
    report_failures(&failures);
    Ok(())
}

/// Analyze a single project directory with analyzer output echoed, without
/// scoring or grading.
pub(crate) async fn run_single_project(rules: &Path, target: &Path, out: &Path) -> CliResult<()> {
    ensure_directory(target).await?;
    tokio::fs::create_dir_all(out.join(NO_FINDINGS_DIR)).await?;
    let project = target
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or("target path has no directory name")?
        .to_string();
    let findings = analyze_one(rules, target, out, &project, true).await?;
    println!("{project}: {findings} finding(s)");
    Ok(())
}

async fn analyze_sequential(run: &RuleRun, projects: &[String]) -> Vec<ProjectFailure> {
    let total = projects.len();
    let mut failures = Vec::new();
    for (index, project) in projects.iter().enumerate() {
        println!("Analyzing {project} [{}/{total}]", index + 1);
        if let Err(error) = analyze_project(run, project).await {
            eprintln!("Analysis of {project} failed: {error}");
            failures.push(ProjectFailure {
                project: project.clone(),
                error: error.to_string(),
            });
        }
    }
    failures
}

async fn analyze_parallel(run: Arc<RuleRun>, projects: Vec<String>) -> Vec<ProjectFailure> {
    let total = projects.len();
    let workers = worker_count();
    println!("Number of workers: {workers}");

    // The channel is sized to the whole batch so feeding it never blocks;
    // workers pull one project at a time until it closes.
    let (sender, receiver) = mpsc::channel::<String>(total);
    let receiver = Arc::new(Mutex::new(receiver));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut tasks: JoinSet<Vec<ProjectFailure>> = JoinSet::new();
    for _ in 0..workers {
        let run = run.clone();
        let receiver = receiver.clone();
        let completed = completed.clone();
        tasks.spawn(async move {
            let mut failures = Vec::new();
            loop {
                let project = { receiver.lock().await.recv().await };
                let Some(project) = project else { break };
                if let Err(error) = analyze_project(&run, &project).await {
                    eprintln!("Analysis of {project} failed: {error}");
                    failures.push(ProjectFailure {
                        project,
                        error: error.to_string(),
                    });
                }
                completed.fetch_add(1, Ordering::SeqCst);
            }
            failures
        });
    }

    let reporter = tokio::spawn(report_progress(completed.clone(), total));

    for project in projects {
        if sender.send(project).await.is_err() {
            break;
        }
    }
    drop(sender);

    let mut failures = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(mut worker_failures) => failures.append(&mut worker_failures),
            Err(error) => failures.push(ProjectFailure {
                project: "<worker>".to_string(),
                error: error.to_string(),
            }),
        }
    }
    // A dead worker leaves the counter short of the total; the advisory
    // reporter must never gate completion, so stop it instead of waiting.
    if completed.load(Ordering::SeqCst) == total {
        let _ = reporter.await;
    } else {
        reporter.abort();
        println!();
    }
    failures
}

/// Poll the shared completion counter and print percent-complete until every
/// project is accounted for. Advisory only; completion never waits on it.
async fn report_progress(completed: Arc<AtomicUsize>, total: usize) {
    let mut ticker = tokio::time::interval(PROGRESS_POLL);
    loop {
        ticker.tick().await;
        let done = completed.load(Ordering::SeqCst);
        let percent = done as f64 / total as f64 * 100.0;
        print!("\rProgress: {percent:.2}% ({done}/{total})");
        let _ = std::io::stdout().flush();
        if done >= total {
            println!();
            return;
        }
    }
}

async fn analyze_project(run: &RuleRun, project: &str) -> CliResult<usize> {
    let target = run.targets.join(project);
    analyze_one(&run.rules, &target, &run.out, project, run.print).await
}

async fn analyze_one(
    rules: &Path,
    target: &Path,
    out: &Path,
    project: &str,
    print: bool,
) -> CliResult<usize> {
    let output_file = out.join(format!("{project}.json"));
    run_analyzer(rules, target, &output_file, print).await?;
    let findings = read_findings_count(&output_file).await?;
    if findings == 0 {
        relocate_no_findings(out, project).await?;
    }
    Ok(findings)
}

async fn run_analyzer(
    rules: &Path,
    target: &Path,
    output_file: &Path,
    print: bool,
) -> CliResult<()> {
    let output = Command::new(ANALYZER_BIN)
        .arg("--json-output")
        .arg(output_file)
        .arg("--config")
        .arg(rules)
        .arg("--")
        .arg(target)
        .output()
        .await?;

    if print {
        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{ANALYZER_BIN} failed with {}: {}",
            output.status,
            stderr.trim()
        )
        .into())
    }
}

async fn read_findings_count(path: &Path) -> CliResult<usize> {
    let contents = tokio::fs::read_to_string(path).await?;
    let findings: FindingsFile = serde_json::from_str(&contents)?;
    Ok(findings.count())
}

async fn relocate_no_findings(out: &Path, project: &str) -> CliResult<()> {
    let record = format!("{project}.json");
    tokio::fs::rename(
        out.join(&record),
        out.join(NO_FINDINGS_DIR).join(&record),
    )
    .await?;
    Ok(())
}

async fn ensure_directory(path: &Path) -> CliResult<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| format!("cannot access {}: {err}", path.display()))?;
    if !metadata.is_dir() {
        return Err(format!("{} is not a directory", path.display()).into());
    }
    Ok(())
}

/// Project subdirectories of the corpus root, by name, in sorted order.
async fn list_project_dirs(targets: &Path) -> CliResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(targets).await?;
    let mut projects = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        projects.push(name);
    }
    projects.sort();
    Ok(projects)
}

/// Base names of records already present in the output root or its
/// `no_findings` subdirectory. Projects listed here are skipped, which makes
/// re-runs idempotent.
async fn existing_record_names(out: &Path) -> CliResult<HashSet<String>> {
    let mut names = HashSet::new();
    for dir in [out.to_path_buf(), out.join(NO_FINDINGS_DIR)] {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                let stem = name.strip_suffix(".json").unwrap_or(name);
                names.insert(stem.to_string());
            }
        }
    }
    Ok(names)
}

fn filter_new_projects(projects: Vec<String>, existing: &HashSet<String>) -> Vec<String> {
    projects
        .into_iter()
        .filter(|name| !existing.contains(name))
        .collect()
}

fn report_failures(failures: &[ProjectFailure]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("{} project(s) failed to analyze:", failures.len());
    for failure in failures {
        eprintln!("- {}: {}", failure.project, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NO_FINDINGS_DIR, existing_record_names, filter_new_projects, list_project_dirs,
        read_findings_count, relocate_no_findings, report_progress, run_analyzer,
    };
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn list_project_dirs_keeps_sorted_visible_directories() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(root.join("beta")).expect("beta");
        std::fs::create_dir_all(root.join("alpha")).expect("alpha");
        std::fs::create_dir_all(root.join(".hidden")).expect("hidden");
        std::fs::write(root.join("stray.json"), "{}").expect("stray file");

        let projects = list_project_dirs(&root).await.expect("projects");

        assert_eq!(projects, vec!["alpha", "beta"]);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn existing_records_union_both_result_directories() {
        let out = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(out.join(NO_FINDINGS_DIR)).expect("dirs");
        std::fs::write(out.join("alpha.json"), "{}").expect("alpha record");
        std::fs::write(out.join(NO_FINDINGS_DIR).join("beta.json"), "{}").expect("beta record");

        let existing = existing_record_names(&out).await.expect("existing");

        assert!(existing.contains("alpha"));
        assert!(existing.contains("beta"));
        assert_eq!(existing.len(), 2);

        std::fs::remove_dir_all(&out).expect("cleanup");
    }

    #[test]
    fn filter_drops_projects_with_recorded_results() {
        let existing: HashSet<String> = ["alpha".to_string()].into_iter().collect();
        let projects = vec!["alpha".to_string(), "beta".to_string()];

        let filtered = filter_new_projects(projects, &existing);

        assert_eq!(filtered, vec!["beta"]);
    }

    #[tokio::test]
    async fn findings_count_reads_results_length() {
        let out = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(&out).expect("out dir");
        let record = out.join("demo.json");
        std::fs::write(&record, r#"{"results": [{}, {}, {}]}"#).expect("record");

        let count = read_findings_count(&record).await.expect("count");
        assert_eq!(count, 3);

        std::fs::write(&record, "not json").expect("overwrite");
        assert!(read_findings_count(&record).await.is_err());

        std::fs::remove_dir_all(&out).expect("cleanup");
    }

    #[tokio::test]
    async fn zero_finding_records_move_to_no_findings() {
        let out = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(out.join(NO_FINDINGS_DIR)).expect("dirs");
        std::fs::write(out.join("clean.json"), r#"{"results": []}"#).expect("record");

        relocate_no_findings(&out, "clean").await.expect("relocate");

        assert!(!out.join("clean.json").exists());
        assert!(out.join(NO_FINDINGS_DIR).join("clean.json").exists());

        std::fs::remove_dir_all(&out).expect("cleanup");
    }

    #[tokio::test]
    async fn rerun_with_recorded_results_processes_no_projects() {
        let root = std::env::temp_dir().join(unique_dir_name());
        let corpus = root.join("corpus");
        let out = root.join("out");
        std::fs::create_dir_all(corpus.join("alpha")).expect("alpha");
        std::fs::create_dir_all(corpus.join("beta")).expect("beta");
        std::fs::create_dir_all(out.join(NO_FINDINGS_DIR)).expect("out dirs");
        std::fs::write(out.join("alpha.json"), r#"{"results": [{}]}"#).expect("alpha record");
        std::fs::write(out.join(NO_FINDINGS_DIR).join("beta.json"), r#"{"results": []}"#)
            .expect("beta record");
        let rules = root.join("rules.yaml");
        std::fs::write(&rules, "rules: []\n").expect("rules file");

        // Every project already has a record, so the run returns before the
        // analyzer is ever invoked.
        let run = super::RuleRun {
            rules,
            targets: corpus,
            out,
            print: false,
        };
        super::run_rule(run, false).await.expect("idempotent rerun");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn progress_reporter_stops_once_total_is_reached() {
        let completed = Arc::new(AtomicUsize::new(4));
        // Returns on the first poll; a hang here would time the test out.
        report_progress(completed, 4).await;
    }

    #[tokio::test]
    async fn analyzer_invocation_with_bad_config_fails() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(root.join("target")).expect("target dir");
        let missing_rules = root.join("no-such-rules.yaml");
        let output_file = root.join("out.json");

        let result = run_analyzer(&missing_rules, &root.join("target"), &output_file, false).await;

        assert!(result.is_err());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    static UNIQUE_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let counter = UNIQUE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        PathBuf::from(format!("satmark_analyzer_test_{nanos}_{counter}"))
    }
}
