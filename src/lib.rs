//! # kinmatch
//!
//! A library for finding likely parent-child relatives in STR genotype
//! databases.
//!
//! Looking at two short-tandem-repeat profiles side by side cannot tell you
//! whether the people are related: common alleles are shared by chance all
//! the time, loci occasionally mutate between generations, and real
//! profiles have missing data. `kinmatch` turns a raw profile database into
//! calibrated kinship evidence by scoring every plausible pair with
//! standard paternity-index likelihood ratios.
//!
//! ## Features
//!
//! - **Likelihood-ratio scoring**: per-locus paternity indexes combined in
//!   log space into a combined likelihood ratio and posterior probability
//! - **Bidirectional orientation**: each pair is scored with the candidate
//!   as parent and as child, keeping the better-supported direction
//! - **Mutation tolerance**: single-step repeat mutations are priced into
//!   the likelihood instead of excluding the pair
//! - **Inverted-index prefilter**: rarity-weighted candidate selection
//!   keeps databases of hundreds of thousands of profiles interactive
//! - **Reference panels**: allele frequencies estimated from the database
//!   itself, or substituted from an embedded or external panel
//!
//! ## Example
//!
//! ```rust,no_run
//! use kinmatch::parsing::delimited::parse_profile_file;
//! use kinmatch::{IndexService, MatchingEngine, ProfileDatabase};
//! use std::path::Path;
//!
//! let table = parse_profile_file(Path::new("str_database.csv")).unwrap();
//! let database = ProfileDatabase::from_profiles(table.panel, table.profiles);
//!
//! let service = IndexService::new(1e-4);
//! let index = service.snapshot_for(&database);
//!
//! let queries = parse_profile_file(Path::new("str_queries.csv")).unwrap();
//! let engine = MatchingEngine::new(&database, &index);
//! for query in queries.align_to(database.panel()) {
//!     for record in engine.find_matches(&query, 10) {
//!         println!(
//!             "{} -> {}: posterior {:.5}",
//!             query.id, record.person_id, record.posterior
//!         );
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Profiles, genotypes, and quantized allele keys
//! - [`population`]: Profile database, frequency and inverted indexes, panels
//! - [`matching`]: Prefilter, per-locus comparison, and the matching engine
//! - [`parsing`]: Delimited profile and ground-truth table readers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod population;

// Re-export commonly used types for convenience
pub use crate::core::genotype::{AlleleKey, Genotype};
pub use crate::core::profile::{LocusPanel, Profile};
pub use crate::core::types::*;
pub use crate::matching::engine::{MatchRecord, MatchingConfig, MatchingEngine, ScoringConfig};
pub use crate::population::database::ProfileDatabase;
pub use crate::population::index::PopulationIndex;
pub use crate::population::panel::ReferencePanel;
pub use crate::population::service::IndexService;
