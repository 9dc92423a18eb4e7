//! Parsers for delimited profile tables.
//!
//! This module provides readers for:
//!
//! - **Profile tables**: databases and query sets with a `PersonID` column
//!   followed by one column per locus
//! - **Ground-truth tables**: `QueryID,TrueCounterpartID` lookup files used
//!   by the evaluate command
//!
//! Comma and tab delimiters are inferred from the extension, gzipped files
//! are decompressed transparently, and malformed genotype cells degrade to
//! missing instead of failing the load.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kinmatch::parsing::delimited::parse_profile_file;
//! use std::path::Path;
//!
//! let table = parse_profile_file(Path::new("str_database.csv")).unwrap();
//! println!("{} profiles over {} loci", table.profiles.len(), table.panel.len());
//! ```

pub mod delimited;
