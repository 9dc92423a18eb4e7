use std::cmp::Ordering;

use serde::Serialize;

use crate::core::profile::Profile;
use crate::core::types::{Confidence, Orientation, PersonId};
use crate::matching::comparator::{evaluate_pair, PairEvaluation};
use crate::matching::prefilter::{CandidateFinder, PrefilterConfig};
use crate::population::database::ProfileDatabase;
use crate::population::index::PopulationIndex;

/// Helper function to convert usize count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// One reported candidate relative
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub person_id: PersonId,

    /// Combined likelihood ratio across all loci
    pub clr: f64,

    /// Posterior probability of the parent-child hypothesis
    pub posterior: f64,

    pub consistent_loci: usize,
    pub mutated_loci: usize,
    pub inconclusive_loci: usize,

    /// Loci neither shared nor one step apart, kept out of the wire format
    #[serde(skip)]
    pub excluded_loci: usize,

    /// Which side played parent in the reported direction
    #[serde(skip)]
    pub orientation: Orientation,

    #[serde(skip)]
    pub confidence: Confidence,
}

/// Tunables for per-locus scoring and result aggregation
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Floor applied to every allele frequency lookup
    pub min_frequency: f64,
    /// Likelihood ratio charged to a locus that excludes parentage
    pub exclusion_ratio: f64,
    /// Single-step mutation rate per locus per generation
    pub mutation_rate: f64,
    /// Mutation rate multiplier when the putative parent is homozygous
    pub homozygous_mutation_scale: f64,
    /// Mutation rate multiplier when the putative parent is heterozygous
    pub heterozygous_mutation_scale: f64,
    /// Log-LR band within which orientation falls back to count tie-breaks
    pub orientation_margin: f64,
    /// Informative loci required before the shared-genotype penalty applies
    pub min_informative_loci: usize,
    /// Shared-genotype fraction above which a pair looks like self or sibling
    pub shared_genotype_threshold: f64,
    /// Penalty log units per unit of excess shared-genotype fraction
    pub shared_genotype_penalty_scale: f64,
    /// Ceiling on the shared-genotype penalty, in log units
    pub shared_genotype_penalty_cap: f64,
    /// Consistent fraction above which the consistency boost applies
    pub consistency_boost_threshold: f64,
    /// Boost per unit of excess consistent fraction
    pub consistency_boost_scale: f64,
    /// Ceiling on the consistency boost multiplier
    pub consistency_boost_cap: f64,
    /// Consistent loci required before the boost applies
    pub consistency_boost_min_loci: usize,
    /// Prior probability of the parent-child hypothesis
    pub prior: f64,
    /// Most excluding loci an admissible candidate may have
    pub max_excluded_loci: usize,
    /// Fewest consistent loci an admissible candidate may have
    pub min_consistent_loci: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_frequency: 1e-4,
            exclusion_ratio: 1e-6,
            mutation_rate: 0.002,
            homozygous_mutation_scale: 1.3,
            heterozygous_mutation_scale: 1.6,
            orientation_margin: 2.5,
            min_informative_loci: 5,
            shared_genotype_threshold: 0.16,
            shared_genotype_penalty_scale: 20.0,
            shared_genotype_penalty_cap: 3.8,
            consistency_boost_threshold: 0.59,
            consistency_boost_scale: 2.9,
            consistency_boost_cap: 1.5,
            consistency_boost_min_loci: 12,
            prior: 0.5,
            max_excluded_loci: 2,
            min_consistent_loci: 1,
        }
    }
}

/// Configuration for the matching engine
#[derive(Debug, Clone, Default)]
pub struct MatchingConfig {
    pub scoring: ScoringConfig,
    pub prefilter: PrefilterConfig,
}

/// The main matching engine: prefilter, score, rank
pub struct MatchingEngine<'a> {
    database: &'a ProfileDatabase,
    index: &'a PopulationIndex,
    config: MatchingConfig,
}

impl<'a> MatchingEngine<'a> {
    /// Create a new matching engine with default configuration
    pub fn new(database: &'a ProfileDatabase, index: &'a PopulationIndex) -> Self {
        Self {
            database,
            index,
            config: MatchingConfig::default(),
        }
    }

    /// Create a new matching engine with custom configuration
    pub fn with_config(
        database: &'a ProfileDatabase,
        index: &'a PopulationIndex,
        config: MatchingConfig,
    ) -> Self {
        Self {
            database,
            index,
            config,
        }
    }

    /// Find the most likely parent-child relatives of `query`, best first,
    /// at most `limit` of them.
    ///
    /// Repeat calls over the same database and query return the same
    /// records in the same order: ranking is by CLR descending, then fewer
    /// excluding loci, then person id.
    pub fn find_matches(&self, query: &Profile, limit: usize) -> Vec<MatchRecord> {
        let finder = CandidateFinder::new(self.database, self.index, &self.config.prefilter);
        let candidates = finder.find_candidates(query);
        tracing::debug!(
            query = %query.id,
            candidates = candidates.len(),
            "prefilter complete"
        );

        let scoring = &self.config.scoring;
        let frequencies = self.index.frequencies();

        let mut records: Vec<MatchRecord> = candidates
            .into_iter()
            .map(|row| {
                let candidate = self.database.profile(row as usize);
                let evaluation = evaluate_pair(query, candidate, frequencies, scoring);
                self.to_record(candidate, &evaluation)
            })
            .collect();

        records.retain(|record| {
            record.excluded_loci <= scoring.max_excluded_loci
                && record.consistent_loci >= scoring.min_consistent_loci
        });

        records.sort_by(|a, b| {
            b.clr
                .partial_cmp(&a.clr)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.excluded_loci.cmp(&b.excluded_loci))
                .then_with(|| a.person_id.cmp(&b.person_id))
        });
        records.truncate(limit);
        records
    }

    /// Find the single best match
    #[cfg(test)]
    pub fn find_best_match(&self, query: &Profile) -> Option<MatchRecord> {
        self.find_matches(query, 1).into_iter().next()
    }

    fn to_record(&self, candidate: &Profile, evaluation: &PairEvaluation) -> MatchRecord {
        let scoring = &self.config.scoring;
        let mut clr = 10_f64.powf(evaluation.log_lr);

        // Candidates consistent at most informative loci get a capped boost;
        // a true child with a mutation or two still outranks lookalikes
        let compared = evaluation.consistent + evaluation.mutated;
        if compared > 0 {
            let ratio = count_to_f64(evaluation.consistent) / count_to_f64(compared);
            if ratio > scoring.consistency_boost_threshold
                && evaluation.consistent >= scoring.consistency_boost_min_loci
            {
                let boost = 1.0
                    + (ratio - scoring.consistency_boost_threshold)
                        * scoring.consistency_boost_scale;
                clr *= boost.min(scoring.consistency_boost_cap);
            }
        }

        let prior = scoring.prior;
        let posterior = (clr * prior) / (clr * prior + (1.0 - prior));

        MatchRecord {
            person_id: candidate.id.clone(),
            clr,
            posterior,
            consistent_loci: evaluation.consistent,
            mutated_loci: evaluation.mutated,
            inconclusive_loci: evaluation.missing,
            excluded_loci: evaluation.excluded,
            orientation: evaluation.orientation,
            confidence: Confidence::from_posterior(posterior),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genotype::Genotype;
    use crate::core::profile::LocusPanel;

    fn profile(id: &str, cells: &[&str]) -> Profile {
        Profile::new(
            PersonId::new(id),
            cells.iter().map(|c| Genotype::parse(c)).collect(),
        )
    }

    fn make_database() -> ProfileDatabase {
        let panel = LocusPanel::new(
            ["TH01", "FGA", "D18S51", "vWA", "D21S11", "TPOX"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        let profiles = vec![
            // Plausible parent of Q1: shares one allele everywhere
            profile("P001", &["9,5", "20,25", "14,17", "16,19", "28,33", "8,12"]),
            // One-step mutation at TH01, shares elsewhere
            profile("P002", &["10,5", "20,25", "14,17", "16,19", "28,33", "8,12"]),
            // Distant: three shares, one step, two excluding loci
            profile("P003", &["6,7", "22,24", "40,41", "25,26", "29,35", "12,4"]),
            // Excluded at every locus
            profile("P004", &["3,4", "40,41", "26,27", "27,28", "36,37", "3,4"]),
            // Shares at four loci with two single-step loci
            profile("P005", &["9,7", "22,30", "12,20", "14,25", "32,36", "10,5"]),
        ];
        ProfileDatabase::from_profiles(panel, profiles)
    }

    fn q1() -> Profile {
        profile("Q1", &["9,6", "25,22", "17,12", "19,14", "33,30", "12,11"])
    }

    #[test]
    fn test_plausible_parent_ranks_first() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let matches = engine.find_matches(&q1(), 10);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].person_id.as_str(), "P001");
        assert!(matches[0].clr > 1.0);
        assert!(matches[0].posterior > 0.5);
    }

    #[test]
    fn test_heavily_excluded_candidate_is_inadmissible() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let matches = engine.find_matches(&q1(), 10);
        assert!(matches.iter().all(|m| m.person_id.as_str() != "P004"));
        assert!(matches.iter().all(|m| m.excluded_loci <= 2));
        assert!(matches.iter().all(|m| m.consistent_loci >= 1));
    }

    #[test]
    fn test_results_sorted_by_clr() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let matches = engine.find_matches(&q1(), 10);
        for pair in matches.windows(2) {
            assert!(pair[0].clr >= pair[1].clr);
        }
    }

    #[test]
    fn test_posterior_bounds() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        for record in engine.find_matches(&q1(), 10) {
            assert!(record.posterior > 0.0 && record.posterior < 1.0);
        }
    }

    #[test]
    fn test_limit_respected() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let matches = engine.find_matches(&q1(), 2);
        assert!(matches.len() <= 2);
    }

    #[test]
    fn test_repeat_calls_identical() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let first = engine.find_matches(&q1(), 10);
        let second = engine.find_matches(&q1(), 10);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.person_id, b.person_id);
            assert!((a.clr - b.clr).abs() < 1e-12);
        }
    }

    #[test]
    fn test_find_best_match() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let best = engine.find_best_match(&q1());
        assert!(best.is_some());
    }

    #[test]
    fn test_mutation_candidate_survives() {
        let db = make_database();
        let index = PopulationIndex::build(&db, 1e-4);
        let engine = MatchingEngine::new(&db, &index);

        let matches = engine.find_matches(&q1(), 10);
        let p002 = matches.iter().find(|m| m.person_id.as_str() == "P002");
        let p002 = p002.expect("single-step mutation candidate should be admissible");
        assert_eq!(p002.mutated_loci, 1);
        assert_eq!(p002.excluded_loci, 0);
        // The mutation costs likelihood: the clean parent ranks above
        assert!(matches[0].clr > p002.clr);
    }
}
