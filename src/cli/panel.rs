use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::cli::OutputFormat;
use crate::core::genotype::AlleleKey;
use crate::matching::engine::ScoringConfig;
use crate::parsing::delimited::parse_profile_file;
use crate::population::database::ProfileDatabase;
use crate::population::index::PopulationIndex;
use crate::population::panel::ReferencePanel;

#[derive(Args)]
pub struct PanelArgs {
    #[command(subcommand)]
    pub command: PanelCommands,
}

#[derive(Subcommand)]
pub enum PanelCommands {
    /// Show a reference panel (embedded by default)
    Show {
        /// Path to a panel JSON file
        #[arg(long)]
        panel: Option<PathBuf>,
    },

    /// Summarize allele frequencies derived from a profile database
    Stats {
        /// Profile database (CSV/TSV, optionally gzipped)
        #[arg(required = true)]
        database: PathBuf,
    },

    /// Derive a panel from a database and export it as JSON
    Export {
        /// Profile database (CSV/TSV, optionally gzipped)
        #[arg(required = true)]
        database: PathBuf,

        /// Output file path
        #[arg(required = true)]
        output: PathBuf,

        /// Panel name recorded in the export
        #[arg(long, default_value = "database-derived")]
        name: String,
    },
}

pub fn run(args: PanelArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        PanelCommands::Show { panel } => run_show(panel, format),
        PanelCommands::Stats { database } => run_stats(database, format, verbose),
        PanelCommands::Export {
            database,
            output,
            name,
        } => run_export(database, output, name),
    }
}

struct LocusStats<'a> {
    name: &'a str,
    alleles: usize,
    typed: usize,
    top: Option<(AlleleKey, f64)>,
}

fn run_show(panel_path: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let panel = match panel_path {
        Some(path) => ReferencePanel::load_from_file(&path)
            .with_context(|| format!("failed to load panel from {}", path.display()))?,
        None => ReferencePanel::load_embedded().context("embedded panel is invalid")?,
    };

    match format {
        OutputFormat::Text => {
            println!("Panel: {} ({} loci)\n", panel.name, panel.num_loci());
            println!("{:<12} {:>8}", "Locus", "Alleles");
            println!("{}", "-".repeat(21));
            for name in panel.locus_names() {
                let alleles = panel.locus_frequencies(name).map_or(0, HashMap::len);
                println!("{name:<12} {alleles:>8}");
            }
        }
        OutputFormat::Json => println!("{}", panel.to_json()?),
        OutputFormat::Tsv => {
            println!("locus\tallele\tfrequency");
            for name in panel.locus_names() {
                if let Some(frequencies) = panel.locus_frequencies(name) {
                    let mut alleles: Vec<_> = frequencies.iter().collect();
                    alleles.sort_by_key(|(allele, _)| **allele);
                    for (allele, frequency) in alleles {
                        println!("{name}\t{allele}\t{frequency:.5}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn run_stats(database_path: PathBuf, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let table = parse_profile_file(&database_path)
        .with_context(|| format!("failed to load database from {}", database_path.display()))?;
    let database = ProfileDatabase::from_profiles(table.panel, table.profiles);
    let index = PopulationIndex::build(&database, ScoringConfig::default().min_frequency);

    if verbose {
        eprintln!(
            "Indexed {} profiles, fingerprint {}",
            database.len(),
            database.fingerprint()
        );
    }

    let mut rows = Vec::new();
    for locus in 0..database.panel().len() {
        let frequencies = index.frequencies().locus_frequencies(locus);
        let typed = database
            .profiles()
            .iter()
            .filter(|p| !p.genotype(locus).is_missing())
            .count();

        let mut alleles: Vec<(&AlleleKey, &f64)> = frequencies.iter().collect();
        alleles.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        rows.push(LocusStats {
            name: database.panel().name(locus),
            alleles: frequencies.len(),
            typed,
            top: alleles.first().map(|(allele, frequency)| (**allele, **frequency)),
        });
    }

    match format {
        OutputFormat::Text => {
            println!(
                "Database: {} profiles, {} loci\n",
                database.len(),
                database.panel().len()
            );
            println!(
                "{:<12} {:>8} {:>8} {:>12} {:>8}",
                "Locus", "Alleles", "Typed", "Top allele", "Freq"
            );
            println!("{}", "-".repeat(54));
            for row in &rows {
                let (top_allele, top_frequency) = match row.top {
                    Some((allele, frequency)) => (allele.to_string(), format!("{frequency:.4}")),
                    None => ("-".to_string(), "-".to_string()),
                };
                println!(
                    "{:<12} {:>8} {:>8} {:>12} {:>8}",
                    row.name, row.alleles, row.typed, top_allele, top_frequency
                );
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "locus": row.name,
                        "alleles": row.alleles,
                        "typed": row.typed,
                        "top_allele": row.top.map(|(allele, _)| allele.to_string()),
                        "top_frequency": row.top.map(|(_, frequency)| frequency),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("locus\talleles\ttyped\ttop_allele\ttop_frequency");
            for row in &rows {
                let (top_allele, top_frequency) = match row.top {
                    Some((allele, frequency)) => (allele.to_string(), format!("{frequency:.6}")),
                    None => (String::new(), String::new()),
                };
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    row.name, row.alleles, row.typed, top_allele, top_frequency
                );
            }
        }
    }

    Ok(())
}

fn run_export(database_path: PathBuf, output: PathBuf, name: String) -> anyhow::Result<()> {
    let table = parse_profile_file(&database_path)
        .with_context(|| format!("failed to load database from {}", database_path.display()))?;
    let database = ProfileDatabase::from_profiles(table.panel, table.profiles);
    let index = PopulationIndex::build(&database, ScoringConfig::default().min_frequency);

    let panel = ReferencePanel::from_frequency_table(name, database.panel(), index.frequencies());
    let json = panel.to_json()?;
    std::fs::write(&output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Exported {} loci to {}", panel.num_loci(), output.display());

    Ok(())
}
