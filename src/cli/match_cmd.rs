use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;
use crate::core::profile::Profile;
use crate::core::types::Confidence;
use crate::matching::engine::{MatchRecord, MatchingConfig, MatchingEngine, ScoringConfig};
use crate::matching::prefilter::PrefilterConfig;
use crate::parsing::delimited::parse_profile_file;
use crate::population::database::ProfileDatabase;
use crate::population::index::PopulationIndex;
use crate::population::panel::ReferencePanel;
use crate::population::service::IndexService;

#[derive(Args)]
pub struct MatchArgs {
    /// Profile database (CSV/TSV with a PersonID column, optionally gzipped)
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// Query profiles, same shape as the database
    #[arg(short, long, required = true)]
    pub queries: PathBuf,

    /// Only evaluate the query with this PersonID
    #[arg(long)]
    pub query_id: Option<String>,

    /// Number of matches to report per query
    #[arg(short = 'k', long, default_value = "10")]
    pub top_k: usize,

    /// Candidate pool size retained by the prefilter
    #[arg(long, default_value = "4000")]
    pub capacity: usize,

    /// Reference panel JSON supplying allele frequencies
    /// (database-derived frequencies are used by default)
    #[arg(long)]
    pub panel: Option<PathBuf>,

    /// Use the embedded core-loci panel for allele frequencies
    #[arg(long, conflicts_with = "panel")]
    pub builtin_panel: bool,

    /// Number of worker threads (defaults to all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Write results as JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Per-query result, in the shape consumed by downstream tooling
#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub query_id: String,
    pub top_candidates: Vec<MatchRecord>,
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be loaded, the requested query id
/// is absent, or results cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    configure_threads(args.threads)?;

    let (database, mut queries) = load_inputs(&args.database, &args.queries, verbose)?;

    if let Some(query_id) = &args.query_id {
        queries.retain(|q| q.id.as_str() == query_id);
        if queries.is_empty() {
            anyhow::bail!(
                "query '{}' not found in {}",
                query_id,
                args.queries.display()
            );
        }
    }

    let index = build_index(
        &database,
        args.panel.as_deref(),
        args.builtin_panel,
        verbose,
    )?;
    let results = run_batch(&database, &index, &queries, args.top_k, args.capacity);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} query results to {}", results.len(), path.display());
        return Ok(());
    }

    match format {
        OutputFormat::Text => print_text_results(&results, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Tsv => print_tsv_results(&results),
    }

    Ok(())
}

/// Route rayon onto a fixed-size pool when requested
pub(crate) fn configure_threads(threads: Option<usize>) -> anyhow::Result<()> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
    }
    Ok(())
}

/// Load the database and query tables, realigning query loci onto the
/// database panel when the headers differ.
pub(crate) fn load_inputs(
    database_path: &Path,
    queries_path: &Path,
    verbose: bool,
) -> anyhow::Result<(ProfileDatabase, Vec<Profile>)> {
    let table = parse_profile_file(database_path)
        .with_context(|| format!("failed to load database from {}", database_path.display()))?;
    let database = ProfileDatabase::from_profiles(table.panel, table.profiles);

    if verbose {
        eprintln!(
            "Loaded {} profiles over {} loci from {}",
            database.len(),
            database.panel().len(),
            database_path.display()
        );
    }

    let query_table = parse_profile_file(queries_path)
        .with_context(|| format!("failed to load queries from {}", queries_path.display()))?;
    let queries = if query_table.panel.names() == database.panel().names() {
        query_table.profiles
    } else {
        warn!(
            database_loci = database.panel().len(),
            query_loci = query_table.panel.len(),
            "query loci differ from database loci, realigning by name"
        );
        query_table.align_to(database.panel())
    };

    Ok((database, queries))
}

/// Build (or reuse) the population index, substituting panel frequencies
/// when one is supplied.
pub(crate) fn build_index(
    database: &ProfileDatabase,
    panel_path: Option<&Path>,
    builtin_panel: bool,
    verbose: bool,
) -> anyhow::Result<Arc<PopulationIndex>> {
    let service = IndexService::new(ScoringConfig::default().min_frequency);
    let index = service.snapshot_for(database);

    let panel = if let Some(path) = panel_path {
        Some(
            ReferencePanel::load_from_file(path)
                .with_context(|| format!("failed to load panel from {}", path.display()))?,
        )
    } else if builtin_panel {
        Some(ReferencePanel::load_embedded().context("embedded panel is invalid")?)
    } else {
        None
    };

    match panel {
        Some(panel) => {
            if verbose {
                eprintln!("Using allele frequencies from panel '{}'", panel.name);
            }
            Ok(Arc::new(panel.substitute_into(&index, database.panel())))
        }
        None => Ok(index),
    }
}

/// Evaluate every query against the database, in input order
pub(crate) fn run_batch(
    database: &ProfileDatabase,
    index: &PopulationIndex,
    queries: &[Profile],
    top_k: usize,
    capacity: usize,
) -> Vec<QueryResult> {
    let config = MatchingConfig {
        prefilter: PrefilterConfig {
            capacity,
            ..PrefilterConfig::default()
        },
        ..MatchingConfig::default()
    };
    let engine = MatchingEngine::with_config(database, index, config);

    let start = Instant::now();
    let results: Vec<QueryResult> = queries
        .par_iter()
        .map(|query| {
            let query_start = Instant::now();
            let top_candidates = engine.find_matches(query, top_k);
            debug!(
                query = %query.id,
                matches = top_candidates.len(),
                elapsed_s = query_start.elapsed().as_secs_f64(),
                "query evaluated"
            );
            QueryResult {
                query_id: query.id.as_str().to_string(),
                top_candidates,
            }
        })
        .collect();

    info!(
        queries = results.len(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "batch complete"
    );
    results
}

fn print_text_results(results: &[QueryResult], verbose: bool) {
    for (qi, result) in results.iter().enumerate() {
        if qi > 0 {
            println!("\n{}", "─".repeat(60));
        }

        if result.top_candidates.is_empty() {
            println!("\nQuery {}: no admissible candidates", result.query_id);
            continue;
        }

        println!(
            "\nQuery {}: {} candidate(s)",
            result.query_id,
            result.top_candidates.len()
        );
        for (i, m) in result.top_candidates.iter().enumerate() {
            let confidence_str = match m.confidence {
                Confidence::VeryHigh => "VERY HIGH",
                Confidence::High => "HIGH",
                Confidence::Medium => "MEDIUM",
                Confidence::Low => "LOW",
            };

            println!("\n#{} {} ({})", i + 1, m.person_id, confidence_str);
            println!("   CLR: {:.4e}   Posterior: {:.5}", m.clr, m.posterior);
            println!(
                "   Loci: {} consistent, {} mutated, {} inconclusive, {} excluded",
                m.consistent_loci, m.mutated_loci, m.inconclusive_loci, m.excluded_loci
            );
            if verbose {
                println!("   Orientation: {}", m.orientation);
            }
        }
    }

    println!();
}

fn print_tsv_results(results: &[QueryResult]) {
    println!(
        "query_id\trank\tperson_id\tclr\tposterior\tconsistent\tmutated\tinconclusive\texcluded\torientation\tconfidence"
    );
    for result in results {
        for (i, m) in result.top_candidates.iter().enumerate() {
            println!(
                "{}\t{}\t{}\t{:.6e}\t{:.6}\t{}\t{}\t{}\t{}\t{}\t{:?}",
                result.query_id,
                i + 1,
                m.person_id,
                m.clr,
                m.posterior,
                m.consistent_loci,
                m.mutated_loci,
                m.inconclusive_loci,
                m.excluded_loci,
                m.orientation,
                m.confidence,
            );
        }
    }
}
