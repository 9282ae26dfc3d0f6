#![deny(missing_docs)]
//! satmark command-line interface.
//!
//! Runs a static-analysis rule across a corpus of projects, grades the
//! findings-per-line distribution, and combines several rules' grades into
//! one weighted report per project.

mod analyzer;
mod scoring;

use std::path::{Path, PathBuf};

use analyzer::RuleRun;
use clap::{Parser, Subcommand};
use satmark_core::{RuleEvaluation, TestInfo, combine_results};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "satmark", version, about = "Static-analysis corpus grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one rule across every project of a corpus and grade the
    /// results.
    EvalRule {
        /// Rule configuration passed to the analyzer.
        rules: PathBuf,
        /// Directory containing one subdirectory per project.
        targets: PathBuf,
        /// Output directory for findings records and reports.
        out: PathBuf,
        /// Language whose lines of code normalize the findings counts.
        language: String,
        /// Echo analyzer output.
        #[arg(short, long)]
        print: bool,
        /// Analyze projects on all available cores.
        #[arg(short = 'm', long)]
        parallel: bool,
    },
    /// Analyze a single project without scoring or grading.
    EvalProject {
        /// Rule configuration passed to the analyzer.
        rules: PathBuf,
        /// Project directory to analyze.
        target: PathBuf,
        /// Output directory for the findings record.
        out: PathBuf,
    },
    /// Combine several rules' persisted evaluations into one weighted
    /// report.
    Combine {
        /// JSON array of rule names and severities.
        test_info: PathBuf,
        /// Directory holding one evaluation file per listed rule.
        results_dir: PathBuf,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::EvalRule {
            rules,
            targets,
            out,
            language,
            print,
            parallel,
        } => {
            let run = RuleRun {
                rules,
                targets: targets.clone(),
                out: out.clone(),
                print,
            };
            analyzer::run_rule(run, parallel).await?;
            scoring::score_rule(&targets, &out, &language).await?;
        }
        Commands::EvalProject { rules, target, out } => {
            analyzer::run_single_project(&rules, &target, &out).await?;
        }
        Commands::Combine {
            test_info,
            results_dir,
        } => {
            run_combine(&test_info, &results_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

/// Number of concurrent workers for both pipeline pools.
pub(crate) fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Combined report file written into the results directory.
const COMBINED_FILE: &str = "combined_results.json";

async fn run_combine(test_info: &Path, results_dir: &Path) -> CliResult<()> {
    let infos = load_test_infos(test_info).await?;

    let mut evaluations = Vec::with_capacity(infos.len());
    for info in infos {
        let path = find_rule_results(results_dir, &info.rule_name)
            .await?
            .ok_or_else(|| format!("no results file found for rule {}", info.rule_name))?;
        let contents = tokio::fs::read_to_string(&path).await?;
        let evaluation: RuleEvaluation = serde_json::from_str(&contents)?;
        evaluations.push((info, evaluation));
    }

    let combined = combine_results(&evaluations);
    let output = results_dir.join(COMBINED_FILE);
    tokio::fs::write(&output, serde_json::to_string_pretty(&combined)?).await?;
    println!("Combined results written to {}", output.display());
    Ok(())
}

async fn load_test_infos(path: &Path) -> CliResult<Vec<TestInfo>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Locate a rule's evaluation file: the first file in sorted directory
/// order whose name ends with `<rule>.json`.
async fn find_rule_results(results_dir: &Path, rule_name: &str) -> CliResult<Option<PathBuf>> {
    let suffix = format!("{rule_name}.json");
    let mut entries = tokio::fs::read_dir(results_dir).await?;
    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with(&suffix) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}
