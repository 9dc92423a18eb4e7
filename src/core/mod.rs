//! Core data types for STR kinship matching.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`AlleleKey`]: A single STR allele, quantized to tenths of a repeat unit
//! - [`Genotype`]: The distinct alleles one person carries at one locus
//! - [`Profile`]: One person's full STR profile, aligned to a [`LocusPanel`]
//! - [`LocusPanel`]: The ordered locus set shared by a database and its queries
//! - [`PersonId`], [`LocusCall`], [`Orientation`], [`Confidence`]: identity and
//!   result classification types
//!
//! ## Allele representation
//!
//! STR alleles are repeat counts with one-decimal microvariants (`9.3` at
//! TH01 is 9 full repeats plus a partial repeat). Storing them in tenths of a
//! repeat makes equality and the one-step mutation test exact:
//!
//! | Cell value | Alleles       | Meaning              |
//! |------------|---------------|----------------------|
//! | `13,14`    | 130, 140      | heterozygous         |
//! | `13,13`    | 130           | homozygous           |
//! | `9.3`      | 93            | single recorded allele |
//! | `-` or empty | none        | not typed            |

pub mod genotype;
pub mod profile;
pub mod types;

pub use genotype::{AlleleKey, Genotype};
pub use profile::{LocusPanel, Profile};
pub use types::{Confidence, LocusCall, Orientation, PersonId};
