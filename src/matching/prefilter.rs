use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::core::profile::Profile;
use crate::population::database::ProfileDatabase;
use crate::population::index::PopulationIndex;

/// Tunables for the candidate prefilter
#[derive(Debug, Clone)]
pub struct PrefilterConfig {
    /// Maximum number of candidates handed to the scorer
    pub capacity: usize,
    /// Cap on the per-allele rarity weight `-log10(f)`
    pub max_rarity_weight: f64,
    /// Alleles below this frequency count as rare
    pub rare_threshold: f64,
    /// Multiplier applied to the weight of rare exact matches
    pub rare_bonus: f64,
    /// Weight multiplier for single-step neighbor hits
    pub step_weight: f64,
    /// Strength of the multi-locus bonus `1 + scale * sqrt(matched loci)`
    pub multi_locus_scale: f64,
    /// Multiplier for candidates with several rare matches
    pub rare_pair_bonus: f64,
    /// Rare matches needed before `rare_pair_bonus` applies
    pub min_rare_matches: u32,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            capacity: 4000,
            max_rarity_weight: 6.0,
            rare_threshold: 0.05,
            rare_bonus: 1.4,
            step_weight: 0.65,
            multi_locus_scale: 0.22,
            rare_pair_bonus: 1.8,
            min_rare_matches: 2,
        }
    }
}

/// Finds database rows worth scoring against a query profile.
///
/// Candidates accumulate weight for every allele they share with the query,
/// scaled by allele rarity: sharing a 1% allele is far stronger evidence of
/// relatedness than sharing a 30% one. Rows reachable only through a
/// single-step mutation neighbor accumulate a reduced weight, so a true
/// child with one mutated locus still surfaces. Ranking is deterministic:
/// ties break toward the lower row index.
pub struct CandidateFinder<'a> {
    database: &'a ProfileDatabase,
    index: &'a PopulationIndex,
    config: &'a PrefilterConfig,
}

impl<'a> CandidateFinder<'a> {
    pub fn new(
        database: &'a ProfileDatabase,
        index: &'a PopulationIndex,
        config: &'a PrefilterConfig,
    ) -> Self {
        Self {
            database,
            index,
            config,
        }
    }

    /// Rank candidate rows for the query, best first, at most
    /// `min(capacity, database size)` of them.
    ///
    /// Rows whose person id equals the query's are never returned. When the
    /// weighted ranking comes up short, remaining rows with any allele
    /// match backfill first, then a sequential scan tops up; a query with no
    /// usable alleles still gets a full candidate set.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn find_candidates(&self, query: &Profile) -> Vec<u32> {
        let config = self.config;
        let frequencies = self.index.frequencies();
        let inverted = self.index.inverted();

        let mut scores: HashMap<u32, f64> = HashMap::new();
        let mut match_counts: HashMap<u32, u32> = HashMap::new();
        let mut rare_matches: HashMap<u32, u32> = HashMap::new();

        for locus in 0..frequencies.num_loci() {
            for &allele in query.genotype(locus).alleles() {
                let frequency = frequencies.frequency(locus, allele);
                let base_weight = (-frequency.log10()).min(config.max_rarity_weight);
                let is_rare = frequency < config.rare_threshold;
                let weight = if is_rare {
                    base_weight * config.rare_bonus
                } else {
                    base_weight
                };

                for &row in inverted.postings(locus, allele) {
                    if self.is_self(row, query) {
                        continue;
                    }
                    *scores.entry(row).or_default() += weight;
                    *match_counts.entry(row).or_default() += 1;
                    if is_rare {
                        *rare_matches.entry(row).or_default() += 1;
                    }
                }

                for neighbor in allele.step_neighbors() {
                    let postings = inverted.postings(locus, neighbor);
                    if postings.is_empty() {
                        continue;
                    }
                    let neighbor_frequency = frequencies.frequency(locus, neighbor);
                    let step_weight = config.step_weight
                        * (-neighbor_frequency.log10()).min(config.max_rarity_weight);
                    for &row in postings {
                        if self.is_self(row, query) {
                            continue;
                        }
                        *scores.entry(row).or_default() += step_weight;
                        // Neighbor-only hits count as at most one matched locus
                        let count = match_counts.entry(row).or_default();
                        if *count == 0 {
                            *count = 1;
                        }
                    }
                }
            }
        }

        for (row, score) in &mut scores {
            let matched = match_counts.get(row).copied().unwrap_or(0);
            if matched > 0 {
                *score *= 1.0 + config.multi_locus_scale * f64::from(matched).sqrt();
                if rare_matches.get(row).copied().unwrap_or(0) >= config.min_rare_matches {
                    *score *= config.rare_pair_bonus;
                }
            }
        }

        let capacity = config.capacity.min(self.database.len());
        let mut ranked: Vec<(u32, f64)> = scores.into_iter().collect();
        // Total order: score descending, then row ascending
        let by_rank = |a: &(u32, f64), b: &(u32, f64)| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        };
        if capacity > 0 && ranked.len() > capacity * 2 {
            // Partial selection keeps the common large-database case cheap
            ranked.select_nth_unstable_by(capacity - 1, by_rank);
            ranked.truncate(capacity);
        }
        ranked.sort_by(by_rank);

        let mut result: Vec<u32> = Vec::with_capacity(capacity);
        let mut seen: HashSet<u32> = HashSet::with_capacity(capacity);
        for &(row, _) in ranked.iter().take(capacity) {
            if seen.insert(row) {
                result.push(row);
            }
        }

        // Rows with an allele match that fell outside the ranked window
        if result.len() < capacity {
            let mut matched: Vec<u32> = match_counts
                .iter()
                .filter(|(_, &count)| count > 0)
                .map(|(&row, _)| row)
                .collect();
            matched.sort_unstable();
            for row in matched {
                if result.len() >= capacity {
                    break;
                }
                if seen.insert(row) {
                    result.push(row);
                }
            }
        }

        // Sequential top-up, for queries with little usable data
        if result.len() < capacity {
            for row in 0..self.database.len() as u32 {
                if result.len() >= capacity {
                    break;
                }
                if self.is_self(row, query) {
                    continue;
                }
                if seen.insert(row) {
                    result.push(row);
                }
            }
        }

        result
    }

    fn is_self(&self, row: u32, query: &Profile) -> bool {
        self.database.profile(row as usize).id == query.id
    }
}
