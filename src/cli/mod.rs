//! Command-line interface for kinmatch.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: Rank likely parent-child relatives for query profiles
//! - **evaluate**: Score a batch run against a ground-truth table
//! - **panel**: Inspect, derive, or export allele frequency panels
//!
//! ## Usage
//!
//! ```text
//! # Rank relatives for every query profile
//! kinmatch match --database str_database.csv --queries str_queries.csv
//!
//! # One query, JSON output for scripting
//! kinmatch match --database str_database.csv --queries str_queries.csv \
//!     --query-id Q0001 --format json
//!
//! # Top-1 accuracy against known relationships
//! kinmatch evaluate --database str_database.csv --queries str_queries.csv \
//!     --truth ground_truth.csv
//!
//! # Inspect the embedded frequency panel
//! kinmatch panel show
//! ```

use clap::{Parser, Subcommand};

pub mod evaluate;
pub mod match_cmd;
pub mod panel;

#[derive(Parser)]
#[command(name = "kinmatch")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Find likely parent-child relatives in STR profile databases")]
#[command(
    long_about = "kinmatch ranks candidate relatives for short-tandem-repeat profiles.\n\nEach query is compared against plausible database profiles in both parent-child orientations using standard paternity-index likelihood ratios, with allele frequencies estimated from the database itself or taken from a reference panel. Results are reported as calibrated combined likelihood ratios with posterior probabilities."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank likely relatives for one or more query profiles
    Match(match_cmd::MatchArgs),

    /// Score a batch run against known true relationships
    Evaluate(evaluate::EvaluateArgs),

    /// Inspect or export allele frequency panels
    Panel(panel::PanelArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
