//! Kinship matching engine and scoring algorithms.
//!
//! This module provides the core matching functionality:
//!
//! - [`MatchingEngine`]: Main entry point for finding candidate relatives
//! - [`CandidateFinder`]: Inverted-index prefilter that picks which rows are
//!   worth scoring
//! - [`compare_locus`](comparator::compare_locus) /
//!   [`evaluate_pair`](comparator::evaluate_pair): per-locus likelihood
//!   ratios and bidirectional pair evaluation
//!
//! ## Matching Algorithm
//!
//! A query runs through three stages:
//!
//! 1. **Prefilter**: posting lists for the query's alleles (and their
//!    single-step neighbors) accumulate rarity-weighted scores per row; the
//!    top rows by weight move on, so a 500k-profile database needs a few
//!    thousand full comparisons rather than half a million
//! 2. **Scoring**: each surviving pair is scored in both parent-child
//!    orientations with standard paternity-index likelihood ratios,
//!    accumulated in log space; the better orientation is kept
//! 3. **Ranking**: per-pair CLRs are boosted for high consistency, filtered
//!    for admissibility, converted to posteriors, and sorted under a total
//!    order (CLR, then fewer exclusions, then person id)
//!
//! ## Example
//!
//! ```rust,no_run
//! use kinmatch::core::{Genotype, LocusPanel, PersonId, Profile};
//! use kinmatch::matching::MatchingEngine;
//! use kinmatch::population::{IndexService, ProfileDatabase};
//!
//! let panel = LocusPanel::new(vec!["TH01".to_string(), "FGA".to_string()]);
//! let profiles = vec![Profile::new(
//!     PersonId::new("P001"),
//!     vec![Genotype::parse("9,9.3"), Genotype::parse("20,22")],
//! )];
//! let database = ProfileDatabase::from_profiles(panel, profiles);
//!
//! let service = IndexService::new(1e-4);
//! let index = service.snapshot_for(&database);
//!
//! let query = Profile::new(
//!     PersonId::new("Q001"),
//!     vec![Genotype::parse("9,7"), Genotype::parse("22,24")],
//! );
//! let engine = MatchingEngine::new(&database, &index);
//! for record in engine.find_matches(&query, 10) {
//!     println!(
//!         "{}: CLR {:.3e} posterior {:.5}",
//!         record.person_id, record.clr, record.posterior
//!     );
//! }
//! ```

pub mod comparator;
pub mod engine;
pub mod prefilter;

pub use engine::{MatchRecord, MatchingConfig, MatchingEngine, ScoringConfig};
pub use prefilter::{CandidateFinder, PrefilterConfig};
