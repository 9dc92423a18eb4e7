use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;
use tracing::warn;

use crate::cli::match_cmd::{build_index, configure_threads, load_inputs, run_batch};
use crate::cli::OutputFormat;
use crate::parsing::delimited::parse_ground_truth_file;

/// Helper function to convert usize count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Profile database (CSV/TSV with a PersonID column, optionally gzipped)
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// Query profiles, same shape as the database
    #[arg(short, long, required = true)]
    pub queries: PathBuf,

    /// Ground truth table with QueryID and TrueCounterpartID columns
    #[arg(short, long, required = true)]
    pub truth: PathBuf,

    /// Number of matches to keep per query
    #[arg(short = 'k', long, default_value = "10")]
    pub top_k: usize,

    /// Candidate pool size retained by the prefilter
    #[arg(long, default_value = "4000")]
    pub capacity: usize,

    /// Reference panel JSON supplying allele frequencies
    #[arg(long)]
    pub panel: Option<PathBuf>,

    /// Use the embedded core-loci panel for allele frequencies
    #[arg(long, conflicts_with = "panel")]
    pub builtin_panel: bool,

    /// Number of worker threads (defaults to all cores)
    #[arg(long)]
    pub threads: Option<usize>,
}

struct Evaluation<'a> {
    query_id: &'a str,
    expected: &'a str,
    predicted: Option<&'a str>,
    hit: bool,
}

/// Execute evaluate subcommand
///
/// Top-1 accuracy is the fraction of ground-truth rows whose query's best
/// match is the true counterpart. Queries absent from the ground truth are
/// skipped; ground-truth rows without a matching query count as misses.
///
/// # Errors
///
/// Returns an error if any input table cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: EvaluateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    configure_threads(args.threads)?;

    let truth = parse_ground_truth_file(&args.truth)
        .with_context(|| format!("failed to load ground truth from {}", args.truth.display()))?;
    if truth.is_empty() {
        warn!("ground truth table has no usable rows");
    }

    let (database, queries) = load_inputs(&args.database, &args.queries, verbose)?;
    let index = build_index(
        &database,
        args.panel.as_deref(),
        args.builtin_panel,
        verbose,
    )?;
    let results = run_batch(&database, &index, &queries, args.top_k, args.capacity);

    let mut evaluations = Vec::new();
    let mut correct = 0usize;
    for result in &results {
        let expected = match truth.get(&result.query_id) {
            Some(expected) => expected.as_str(),
            None => continue,
        };
        let predicted = result
            .top_candidates
            .first()
            .map(|m| m.person_id.as_str());
        let hit = predicted == Some(expected);
        if hit {
            correct += 1;
        }
        evaluations.push(Evaluation {
            query_id: &result.query_id,
            expected,
            predicted,
            hit,
        });
    }

    let total = truth.len();
    let accuracy = if total == 0 {
        0.0
    } else {
        count_to_f64(correct) / count_to_f64(total)
    };

    match format {
        OutputFormat::Text => {
            if verbose {
                for e in &evaluations {
                    let mark = if e.hit { "hit " } else { "miss" };
                    println!(
                        "{} {}  expected {}  got {}",
                        mark,
                        e.query_id,
                        e.expected,
                        e.predicted.unwrap_or("-")
                    );
                }
                println!();
            }
            println!(
                "Evaluated {} of {} ground truth entries",
                evaluations.len(),
                total
            );
            println!(
                "Top-1 accuracy: {:.1}% ({}/{})",
                accuracy * 100.0,
                correct,
                total
            );
        }
        OutputFormat::Json => {
            let output = json!({
                "total": total,
                "evaluated": evaluations.len(),
                "correct": correct,
                "accuracy": accuracy,
                "queries": evaluations.iter().map(|e| json!({
                    "query_id": e.query_id,
                    "expected": e.expected,
                    "predicted": e.predicted,
                    "hit": e.hit,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("query_id\texpected\tpredicted\thit");
            for e in &evaluations {
                println!(
                    "{}\t{}\t{}\t{}",
                    e.query_id,
                    e.expected,
                    e.predicted.unwrap_or(""),
                    e.hit
                );
            }
            eprintln!(
                "Top-1 accuracy: {:.1}% ({}/{})",
                accuracy * 100.0,
                correct,
                total
            );
        }
    }

    Ok(())
}
