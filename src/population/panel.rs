use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::genotype::AlleleKey;
use crate::core::profile::LocusPanel;

use super::index::{AlleleFrequencyTable, PopulationIndex};

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to read panel: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse panel: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid allele '{allele}' at locus {locus}")]
    InvalidAllele { locus: String, allele: String },
}

/// Panel document version for compatibility checking
pub const PANEL_VERSION: &str = "1.0.0";

/// Serializable reference panel format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelData {
    pub version: String,
    pub created_at: String,
    pub name: String,
    pub loci: Vec<PanelLocus>,
}

/// Published allele frequencies for one locus, keyed by allele string
/// (e.g. `"9.3"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelLocus {
    pub locus: String,
    pub frequencies: HashMap<String, f64>,
}

/// A curated set of published allele frequencies.
///
/// When supplied, panel frequencies replace the database-derived ones for
/// the loci the panel covers; the inverted index stays database-built, since
/// postings must point at actual database rows.
#[derive(Debug, Clone)]
pub struct ReferencePanel {
    pub name: String,
    by_locus: HashMap<String, HashMap<AlleleKey, f64>>,
}

impl ReferencePanel {
    /// Load the embedded core-loci panel
    pub fn load_embedded() -> Result<Self, PanelError> {
        const EMBEDDED_PANEL: &str = include_str!("../../panels/core_loci.json");
        Self::from_json(EMBEDDED_PANEL)
    }

    /// Load a panel from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, PanelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a panel from JSON
    pub fn from_json(json: &str) -> Result<Self, PanelError> {
        let data: PanelData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != PANEL_VERSION {
            tracing::warn!(
                expected = PANEL_VERSION,
                found = data.version,
                "panel version mismatch"
            );
        }

        let mut by_locus = HashMap::with_capacity(data.loci.len());
        for locus in data.loci {
            let mut frequencies = HashMap::with_capacity(locus.frequencies.len());
            for (allele, frequency) in locus.frequencies {
                let key = AlleleKey::parse(&allele).ok_or_else(|| PanelError::InvalidAllele {
                    locus: locus.locus.clone(),
                    allele: allele.clone(),
                })?;
                frequencies.insert(key, frequency);
            }
            by_locus.insert(locus.locus, frequencies);
        }

        Ok(Self {
            name: data.name,
            by_locus,
        })
    }

    /// Build a panel from database-derived frequencies, for export
    #[must_use]
    pub fn from_frequency_table(
        name: impl Into<String>,
        panel: &LocusPanel,
        table: &AlleleFrequencyTable,
    ) -> Self {
        let by_locus = (0..panel.len())
            .map(|locus| {
                (
                    panel.name(locus).to_string(),
                    table.locus_frequencies(locus).clone(),
                )
            })
            .collect();
        Self {
            name: name.into(),
            by_locus,
        }
    }

    #[must_use]
    pub fn num_loci(&self) -> usize {
        self.by_locus.len()
    }

    #[must_use]
    pub fn locus_frequencies(&self, name: &str) -> Option<&HashMap<AlleleKey, f64>> {
        self.by_locus.get(name)
    }

    /// Locus names in sorted order
    #[must_use]
    pub fn locus_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_locus.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Produce a copy of `index` whose frequencies come from this panel for
    /// every covered locus
    #[must_use]
    pub fn substitute_into(&self, index: &PopulationIndex, panel: &LocusPanel) -> PopulationIndex {
        index.with_frequencies(panel, &self.by_locus)
    }

    /// Export the panel to JSON
    pub fn to_json(&self) -> Result<String, PanelError> {
        let mut loci: Vec<PanelLocus> = self
            .by_locus
            .iter()
            .map(|(name, frequencies)| PanelLocus {
                locus: name.clone(),
                frequencies: frequencies
                    .iter()
                    .map(|(allele, frequency)| (allele.to_string(), *frequency))
                    .collect(),
            })
            .collect();
        loci.sort_by(|a, b| a.locus.cmp(&b.locus));

        let data = PanelData {
            version: PANEL_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            name: self.name.clone(),
            loci,
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }
}
