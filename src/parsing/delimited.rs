//! Reader for delimited profile tables.
//!
//! Loads STR profile databases, query sets, and ground-truth tables from
//! delimited text. The identifier column must be named `PersonID`; every
//! other column is a locus. Genotype cells hold comma-separated allele
//! values (`"9,9.3"`), so comma-delimited files rely on standard CSV
//! quoting.
//!
//! Supported extensions:
//! - `.csv` (comma separated)
//! - `.tsv`, `.txt` (tab separated)
//! - any of the above plus `.gz` (gzip compressed)

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::warn;

use crate::core::{Genotype, LocusPanel, PersonId, Profile};

/// Identifier column name, shared by database and query tables.
pub const ID_COLUMN: &str = "PersonID";

const QUERY_COLUMN: &str = "QueryID";
const TRUTH_COLUMN: &str = "TrueCounterpartID";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid profile table format: {0}")]
    InvalidFormat(String),

    #[error("No 'PersonID' column in header: {0}")]
    MissingIdColumn(String),
}

/// A parsed profile table: the locus columns found in the header plus one
/// profile per data row. Duplicate identifiers keep both rows.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    pub panel: LocusPanel,
    pub profiles: Vec<Profile>,
}

impl ProfileTable {
    /// Re-express every profile on `target`'s locus order. Loci absent from
    /// this table come out missing.
    #[must_use]
    pub fn align_to(&self, target: &LocusPanel) -> Vec<Profile> {
        let mapping = target.projection_from(&self.panel);
        self.profiles.iter().map(|p| p.project(&mapping)).collect()
    }
}

/// Infer the field delimiter from the file extension.
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn delimiter_for(path: &Path) -> u8 {
    let path_str = path.to_string_lossy().to_lowercase();
    if path_str.ends_with(".tsv")
        || path_str.ends_with(".tsv.gz")
        || path_str.ends_with(".txt")
        || path_str.ends_with(".txt.gz")
    {
        b'\t'
    } else {
        b','
    }
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".gz")
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Parse a profile table (database or query set) from a delimited file.
///
/// The delimiter comes from the extension (`.tsv`/`.txt` tab, otherwise
/// comma) and `.gz` files are transparently decompressed.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read,
/// `ParseError::MissingIdColumn` if the header lacks a `PersonID` column,
/// or `ParseError::InvalidFormat` for an empty file or a file with no data
/// rows.
pub fn parse_profile_file(path: &Path) -> Result<ProfileTable, ParseError> {
    parse_profile_reader(open_reader(path)?, delimiter_for(path))
}

/// Parse a profile table from any reader.
///
/// Malformed genotype cells never fail the parse: unreadable values degrade
/// to missing with a warning, and short rows are padded with missing loci.
///
/// # Errors
///
/// Returns `ParseError::Csv` on malformed delimited structure,
/// `ParseError::MissingIdColumn` if the header lacks a `PersonID` column,
/// or `ParseError::InvalidFormat` for an empty file or a file with no data
/// rows.
pub fn parse_profile_reader<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<ProfileTable, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(ParseError::InvalidFormat("empty file".to_string()));
    }

    let id_column = headers
        .iter()
        .position(|name| name == ID_COLUMN)
        .ok_or_else(|| ParseError::MissingIdColumn(headers.iter().collect::<Vec<_>>().join(", ")))?;
    let locus_columns: Vec<usize> = (0..headers.len()).filter(|&col| col != id_column).collect();
    let panel = LocusPanel::new(
        locus_columns
            .iter()
            .map(|&col| headers[col].to_string())
            .collect(),
    );

    let mut profiles = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);

        let id = record.get(id_column).map_or("", str::trim);
        if id.is_empty() {
            warn!(line, "row without a PersonID skipped");
            continue;
        }
        if record.len() > headers.len() {
            warn!(
                line,
                expected = headers.len(),
                found = record.len(),
                "extra trailing fields ignored"
            );
        }

        let mut genotypes = Vec::with_capacity(locus_columns.len());
        for (slot, &col) in locus_columns.iter().enumerate() {
            let cell = record.get(col).map_or("", str::trim);
            let genotype = Genotype::parse(cell);
            if genotype.is_missing() && !cell.is_empty() && cell != "-" {
                warn!(
                    line,
                    locus = %panel.name(slot),
                    value = cell,
                    "unparseable genotype treated as missing"
                );
            }
            genotypes.push(genotype);
        }
        profiles.push(Profile::new(PersonId::new(id), genotypes));
    }

    if profiles.is_empty() {
        return Err(ParseError::InvalidFormat(
            "no profile rows found in file".to_string(),
        ));
    }

    Ok(ProfileTable { panel, profiles })
}

/// Parse a `QueryID,TrueCounterpartID` table into a lookup map.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read,
/// `ParseError::Csv` on malformed delimited structure, or
/// `ParseError::InvalidFormat` if either required column is absent.
pub fn parse_ground_truth_file(path: &Path) -> Result<HashMap<String, String>, ParseError> {
    parse_ground_truth_reader(open_reader(path)?, delimiter_for(path))
}

/// Parse a ground-truth table from any reader. Rows with a blank query or
/// counterpart are skipped; a repeated query keeps the last row.
///
/// # Errors
///
/// Returns `ParseError::Csv` on malformed delimited structure, or
/// `ParseError::InvalidFormat` if either required column is absent.
pub fn parse_ground_truth_reader<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<HashMap<String, String>, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let query_column = headers.iter().position(|name| name == QUERY_COLUMN).ok_or_else(|| {
        ParseError::InvalidFormat(format!("no '{QUERY_COLUMN}' column in ground truth header"))
    })?;
    let truth_column = headers.iter().position(|name| name == TRUTH_COLUMN).ok_or_else(|| {
        ParseError::InvalidFormat(format!("no '{TRUTH_COLUMN}' column in ground truth header"))
    })?;

    let mut truth = HashMap::new();
    for result in rdr.records() {
        let record = result?;
        let query = record.get(query_column).map_or("", str::trim);
        let counterpart = record.get(truth_column).map_or("", str::trim);
        if query.is_empty() || counterpart.is_empty() {
            warn!(
                line = record.position().map_or(0, csv::Position::line),
                "incomplete ground truth row skipped"
            );
            continue;
        }
        truth.insert(query.to_string(), counterpart.to_string());
    }

    Ok(truth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_csv_with_quoted_cells() {
        let csv_text = "PersonID,TH01,FGA\nP001,\"9,9.3\",\"20,22\"\nP002,13,\"14,15\"\n";

        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();
        assert_eq!(table.panel.names(), &["TH01".to_string(), "FGA".to_string()]);
        assert_eq!(table.profiles.len(), 2);
        assert_eq!(table.profiles[0].id.as_str(), "P001");
        assert_eq!(table.profiles[0].genotype(0).canonical(), "9,9.3");
        assert_eq!(table.profiles[0].genotype(1).canonical(), "20,22");
        assert!(table.profiles[1].genotype(0).is_homozygous());
    }

    #[test]
    fn test_parse_profile_tsv() {
        let tsv_text = "PersonID\tTH01\tFGA\nP001\t9,9.3\t20,22\n";

        let table = parse_profile_reader(tsv_text.as_bytes(), b'\t').unwrap();
        assert_eq!(table.profiles.len(), 1);
        assert_eq!(table.profiles[0].genotype(0).canonical(), "9,9.3");
    }

    #[test]
    fn test_id_column_not_first() {
        let csv_text = "TH01,PersonID,FGA\n\"6,7\",P001,22\n";

        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();
        assert_eq!(table.panel.names(), &["TH01".to_string(), "FGA".to_string()]);
        assert_eq!(table.profiles[0].id.as_str(), "P001");
        assert_eq!(table.profiles[0].genotype(0).canonical(), "6,7");
        assert_eq!(table.profiles[0].genotype(1).canonical(), "22");
    }

    #[test]
    fn test_missing_id_column() {
        let csv_text = "Name,TH01\nP001,\"9,9.3\"\n";

        let err = parse_profile_reader(csv_text.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, ParseError::MissingIdColumn(_)));
    }

    #[test]
    fn test_empty_file() {
        let err = parse_profile_reader(&b""[..], b',').unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_header_without_rows() {
        let err = parse_profile_reader(&b"PersonID,TH01\n"[..], b',').unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_short_row_pads_missing() {
        let csv_text = "PersonID,TH01,FGA,D18S51\nP001,\"9,9.3\"\n";

        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();
        assert!(!table.profiles[0].genotype(0).is_missing());
        assert!(table.profiles[0].genotype(1).is_missing());
        assert!(table.profiles[0].genotype(2).is_missing());
    }

    #[test]
    fn test_malformed_cells_degrade_to_missing() {
        let csv_text = "PersonID,TH01,FGA\nP001,garbage,\"9,x\"\n";

        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();
        assert!(table.profiles[0].genotype(0).is_missing());
        // The readable token survives
        assert_eq!(table.profiles[0].genotype(1).canonical(), "9");
    }

    #[test]
    fn test_blank_id_rows_skipped() {
        let csv_text = "PersonID,TH01\nP001,13\n,14\nP002,15\n";

        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();
        assert_eq!(table.profiles.len(), 2);
        assert_eq!(table.profiles[1].id.as_str(), "P002");
    }

    #[test]
    fn test_align_to_reorders_and_fills() {
        let csv_text = "PersonID,FGA,TH01\nP001,\"20,22\",\"9,9.3\"\n";
        let table = parse_profile_reader(csv_text.as_bytes(), b',').unwrap();

        let target = LocusPanel::new(vec![
            "TH01".to_string(),
            "D18S51".to_string(),
            "FGA".to_string(),
        ]);
        let aligned = table.align_to(&target);
        assert_eq!(aligned[0].genotype(0).canonical(), "9,9.3");
        assert!(aligned[0].genotype(1).is_missing());
        assert_eq!(aligned[0].genotype(2).canonical(), "20,22");
    }

    #[test]
    fn test_parse_ground_truth() {
        let csv_text = "QueryID,TrueCounterpartID\nQ001,P042\nQ002,P007\n";

        let truth = parse_ground_truth_reader(csv_text.as_bytes(), b',').unwrap();
        assert_eq!(truth.len(), 2);
        assert_eq!(truth.get("Q001").map(String::as_str), Some("P042"));
        assert_eq!(truth.get("Q002").map(String::as_str), Some("P007"));
    }

    #[test]
    fn test_ground_truth_missing_column() {
        let csv_text = "QueryID,Answer\nQ001,P042\n";

        let err = parse_ground_truth_reader(csv_text.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_gzipped_csv_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.csv.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(b"PersonID,TH01,FGA\nP001,\"9,9.3\",\"20,22\"\n")
            .unwrap();
        encoder.finish().unwrap();

        let table = parse_profile_file(&path).unwrap();
        assert_eq!(table.profiles.len(), 1);
        assert_eq!(table.profiles[0].genotype(0).canonical(), "9,9.3");
    }
}
