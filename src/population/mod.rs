//! Population database storage and indexing.
//!
//! A [`ProfileDatabase`] is an immutable, fingerprinted set of STR profiles.
//! From it the [`IndexService`] derives and caches a [`PopulationIndex`],
//! the read model matching runs against:
//!
//! - [`AlleleFrequencyTable`](index::AlleleFrequencyTable): floored
//!   population allele frequencies per locus
//! - [`InvertedIndex`](index::InvertedIndex): (locus, allele) to database
//!   rows, for candidate prefiltering
//!
//! Index snapshots are keyed on the database content fingerprint, so edits
//! anywhere in the data force a rebuild and byte-identical reloads reuse the
//! cached snapshot. [`ReferencePanel`] swaps published allele frequencies in
//! for the database-derived ones when a curated panel is preferred.

pub mod database;
pub mod index;
pub mod panel;
pub mod service;

pub use database::ProfileDatabase;
pub use index::PopulationIndex;
pub use panel::ReferencePanel;
pub use service::IndexService;
