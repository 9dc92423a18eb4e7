use std::collections::HashMap;

use rayon::prelude::*;

use crate::core::genotype::AlleleKey;
use crate::core::profile::LocusPanel;

use super::database::ProfileDatabase;

/// Helper function to convert usize count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Population allele frequencies per locus.
///
/// The denominator at each locus is the number of distinct-allele
/// observations: every profile contributes each of its distinct alleles
/// once, so a homozygote counts once and a heterozygote twice.
///
/// Lookups never return less than the configured floor. Alleles absent from
/// the population get the floor outright, which keeps likelihood ratios
/// finite for alleles seen only in a query.
#[derive(Debug, Clone)]
pub struct AlleleFrequencyTable {
    per_locus: Vec<HashMap<AlleleKey, f64>>,
    min_frequency: f64,
}

impl AlleleFrequencyTable {
    #[must_use]
    pub fn new(per_locus: Vec<HashMap<AlleleKey, f64>>, min_frequency: f64) -> Self {
        Self {
            per_locus,
            min_frequency,
        }
    }

    /// Floored frequency of an allele at a locus
    #[must_use]
    pub fn frequency(&self, locus: usize, allele: AlleleKey) -> f64 {
        self.per_locus[locus]
            .get(&allele)
            .copied()
            .unwrap_or(self.min_frequency)
            .max(self.min_frequency)
    }

    /// The raw frequency map for one locus, without flooring
    #[must_use]
    pub fn locus_frequencies(&self, locus: usize) -> &HashMap<AlleleKey, f64> {
        &self.per_locus[locus]
    }

    #[must_use]
    pub fn min_frequency(&self) -> f64 {
        self.min_frequency
    }

    #[must_use]
    pub fn num_loci(&self) -> usize {
        self.per_locus.len()
    }
}

/// Inverted index mapping (locus, allele) to the database rows carrying
/// that allele. Posting lists are sorted ascending by row.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    per_locus: Vec<HashMap<AlleleKey, Vec<u32>>>,
}

impl InvertedIndex {
    /// Rows carrying `allele` at `locus`; empty when the allele was never
    /// observed there
    #[must_use]
    pub fn postings(&self, locus: usize, allele: AlleleKey) -> &[u32] {
        self.per_locus[locus]
            .get(&allele)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn num_alleles(&self, locus: usize) -> usize {
        self.per_locus[locus].len()
    }
}

/// The derived read model of one [`ProfileDatabase`]: allele frequencies and
/// the inverted index, stamped with the fingerprint of the database they
/// were built from.
#[derive(Debug, Clone)]
pub struct PopulationIndex {
    frequencies: AlleleFrequencyTable,
    inverted: InvertedIndex,
    fingerprint: String,
    num_profiles: usize,
}

impl PopulationIndex {
    /// Build frequencies and postings in one pass over the database.
    ///
    /// Loci are independent, so columns build in parallel; each column scans
    /// rows in order, which keeps posting lists sorted and the result
    /// deterministic regardless of thread scheduling.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(database: &ProfileDatabase, min_frequency: f64) -> Self {
        let num_loci = database.panel().len();
        tracing::debug!(
            profiles = database.len(),
            loci = num_loci,
            "building population index"
        );

        let columns: Vec<(HashMap<AlleleKey, f64>, HashMap<AlleleKey, Vec<u32>>)> = (0..num_loci)
            .into_par_iter()
            .map(|locus| {
                let mut counts: HashMap<AlleleKey, u64> = HashMap::new();
                let mut postings: HashMap<AlleleKey, Vec<u32>> = HashMap::new();
                let mut total: u64 = 0;
                for (row, profile) in database.profiles().iter().enumerate() {
                    for &allele in profile.genotype(locus).alleles() {
                        *counts.entry(allele).or_default() += 1;
                        // Row counts are bounded well below u32::MAX
                        postings.entry(allele).or_default().push(row as u32);
                        total += 1;
                    }
                }
                let frequencies = if total == 0 {
                    HashMap::new()
                } else {
                    counts
                        .into_iter()
                        .map(|(allele, count)| {
                            (allele, count_to_f64(count) / count_to_f64(total))
                        })
                        .collect()
                };
                (frequencies, postings)
            })
            .collect();

        let mut per_locus_freqs = Vec::with_capacity(num_loci);
        let mut per_locus_postings = Vec::with_capacity(num_loci);
        for (frequencies, postings) in columns {
            per_locus_freqs.push(frequencies);
            per_locus_postings.push(postings);
        }

        Self {
            frequencies: AlleleFrequencyTable::new(per_locus_freqs, min_frequency),
            inverted: InvertedIndex {
                per_locus: per_locus_postings,
            },
            fingerprint: database.fingerprint().to_string(),
            num_profiles: database.len(),
        }
    }

    #[must_use]
    pub fn frequencies(&self) -> &AlleleFrequencyTable {
        &self.frequencies
    }

    #[must_use]
    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    /// Fingerprint of the database this index was built from
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn num_profiles(&self) -> usize {
        self.num_profiles
    }

    /// True when this index reflects the given database's current content
    #[must_use]
    pub fn is_current_for(&self, database: &ProfileDatabase) -> bool {
        self.fingerprint == database.fingerprint()
    }

    /// Replace frequency maps for the loci a reference panel covers, keeping
    /// the inverted index and fingerprint. Loci the panel does not cover
    /// keep their database-derived frequencies.
    #[must_use]
    pub fn with_frequencies(
        &self,
        panel: &LocusPanel,
        replacements: &HashMap<String, HashMap<AlleleKey, f64>>,
    ) -> Self {
        let mut per_locus = Vec::with_capacity(panel.len());
        let mut covered = 0usize;
        for locus in 0..panel.len() {
            match replacements.get(panel.name(locus)) {
                Some(frequencies) => {
                    covered += 1;
                    per_locus.push(frequencies.clone());
                }
                None => per_locus.push(self.frequencies.locus_frequencies(locus).clone()),
            }
        }
        if covered < panel.len() {
            tracing::warn!(
                covered,
                total = panel.len(),
                "reference panel covers a subset of loci, keeping database frequencies for the rest"
            );
        }
        Self {
            frequencies: AlleleFrequencyTable::new(per_locus, self.frequencies.min_frequency()),
            inverted: self.inverted.clone(),
            fingerprint: self.fingerprint.clone(),
            num_profiles: self.num_profiles,
        }
    }
}
