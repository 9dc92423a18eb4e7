use crate::core::genotype::Genotype;
use crate::core::profile::Profile;
use crate::core::types::{LocusCall, Orientation};
use crate::population::index::AlleleFrequencyTable;

use crate::matching::engine::ScoringConfig;

/// Helper function to convert usize count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Outcome of comparing one locus in one parent-child direction
#[derive(Debug, Clone, Copy)]
pub struct LocusComparison {
    pub call: LocusCall,
    /// log10 of the per-locus likelihood ratio
    pub log_lr: f64,
}

/// Compare one locus under the hypothesis that `parent` is a parent of
/// `child`, against the alternative that they are unrelated.
///
/// The likelihood ratio is the standard paternity index:
///
/// - shared allele `a`: `LR = P(a | parent) / f(a)` with transmission
///   probability 1.0 for a homozygous parent and 0.5 for a heterozygous one
/// - no shared allele but a pair one repeat apart: `LR = mu / f(child
///   allele)` with the mutation rate scaled up slightly per parent zygosity
/// - no shared allele, no single-step pair: the configured exclusion ratio
/// - either genotype missing: neutral, `LR = 1`
///
/// When both alleles of a heterozygous child match, the per-allele ratios
/// are summed and the square root taken, which rewards the double match
/// without crediting full-genotype identity the way a sibling test would.
/// Shared-allele evidence never scores below `LR = 1`.
#[must_use]
pub fn compare_locus(
    child: &Genotype,
    parent: &Genotype,
    frequencies: &AlleleFrequencyTable,
    locus: usize,
    config: &ScoringConfig,
) -> LocusComparison {
    if child.is_missing() || parent.is_missing() {
        return LocusComparison {
            call: LocusCall::Missing,
            log_lr: 0.0,
        };
    }

    let transmission = if parent.is_homozygous() { 1.0 } else { 0.5 };

    let shared = child.shared_alleles(parent);
    if !shared.is_empty() {
        let mut total_lr = 0.0;
        let mut best_lr = 0.0_f64;
        for &allele in &shared {
            let lr = transmission / frequencies.frequency(locus, allele);
            total_lr += lr;
            best_lr = best_lr.max(lr);
        }
        let combined = if shared.len() > 1 {
            total_lr.sqrt()
        } else {
            best_lr
        };
        return LocusComparison {
            call: LocusCall::Consistent,
            log_lr: combined.max(1.0).log10(),
        };
    }

    let mutation_rate = if parent.is_homozygous() {
        config.mutation_rate * config.homozygous_mutation_scale
    } else {
        config.mutation_rate * config.heterozygous_mutation_scale
    };
    let mut best_mutation_lr: Option<f64> = None;
    for &child_allele in child.alleles() {
        for &parent_allele in parent.alleles() {
            if child_allele.is_single_step(parent_allele) {
                let lr = mutation_rate / frequencies.frequency(locus, child_allele);
                best_mutation_lr = Some(best_mutation_lr.map_or(lr, |best| best.max(lr)));
            }
        }
    }
    if let Some(best) = best_mutation_lr {
        return LocusComparison {
            call: LocusCall::Mutation,
            log_lr: best.max(config.exclusion_ratio).log10(),
        };
    }

    LocusComparison {
        call: LocusCall::Exclusion,
        log_lr: config.exclusion_ratio.log10(),
    }
}

/// Accumulated evidence for one parent-child direction across the panel
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionTotals {
    pub log_lr: f64,
    pub consistent: usize,
    pub mutated: usize,
    pub missing: usize,
    pub excluded: usize,
}

impl DirectionTotals {
    fn add(&mut self, comparison: LocusComparison) {
        self.log_lr += comparison.log_lr;
        match comparison.call {
            LocusCall::Consistent => self.consistent += 1,
            LocusCall::Mutation => self.mutated += 1,
            LocusCall::Missing => self.missing += 1,
            LocusCall::Exclusion => self.excluded += 1,
        }
    }

    /// Loci where both genotypes were present
    #[must_use]
    pub fn informative(&self) -> usize {
        self.consistent + self.mutated + self.excluded
    }
}

/// Bidirectional evaluation of one query-candidate pair, reported for the
/// chosen orientation
#[derive(Debug, Clone, Copy)]
pub struct PairEvaluation {
    pub orientation: Orientation,
    /// Total log10 likelihood ratio, shared-genotype penalty applied
    pub log_lr: f64,
    pub consistent: usize,
    pub mutated: usize,
    pub missing: usize,
    pub excluded: usize,
}

/// Score a pair in both parent-child orientations and keep the better one.
///
/// Parent-child orientation is not observable from two profiles alone, so
/// both hypotheses are scored. Pairs sharing their full genotype at an
/// outsized fraction of informative loci look like the same person or a
/// sibling rather than a parent, and are penalized in log space before the
/// orientation is chosen.
#[must_use]
pub fn evaluate_pair(
    query: &Profile,
    candidate: &Profile,
    frequencies: &AlleleFrequencyTable,
    config: &ScoringConfig,
) -> PairEvaluation {
    let mut forward = DirectionTotals::default();
    let mut reverse = DirectionTotals::default();
    let mut shared_genotypes = 0usize;

    for locus in 0..frequencies.num_loci() {
        let query_genotype = query.genotype(locus);
        let candidate_genotype = candidate.genotype(locus);

        if query_genotype.allele_count() == 2
            && candidate_genotype.allele_count() == 2
            && query_genotype == candidate_genotype
        {
            shared_genotypes += 1;
        }

        forward.add(compare_locus(
            query_genotype,
            candidate_genotype,
            frequencies,
            locus,
            config,
        ));
        reverse.add(compare_locus(
            candidate_genotype,
            query_genotype,
            frequencies,
            locus,
            config,
        ));
    }

    let informative = forward.informative();
    if informative > config.min_informative_loci {
        let ratio = count_to_f64(shared_genotypes) / count_to_f64(informative);
        if ratio > config.shared_genotype_threshold {
            let penalty = ((ratio - config.shared_genotype_threshold)
                * config.shared_genotype_penalty_scale)
                .min(config.shared_genotype_penalty_cap);
            forward.log_lr -= penalty;
            reverse.log_lr -= penalty;
        }
    }

    let orientation = choose_orientation(&forward, &reverse, config.orientation_margin);
    let chosen = match orientation {
        Orientation::CandidateParent => forward,
        Orientation::CandidateChild => reverse,
    };

    PairEvaluation {
        orientation,
        log_lr: chosen.log_lr,
        consistent: chosen.consistent,
        mutated: chosen.mutated,
        missing: chosen.missing,
        excluded: chosen.excluded,
    }
}

/// Pick the orientation to report.
///
/// Within `margin` log units the totals are considered equivalent and the
/// cascade applies: fewer exclusions, then more consistent loci, then fewer
/// mutations. Outside the margin, or when the cascade stays tied, the higher
/// total log LR wins, with the candidate-as-parent direction taking exact
/// ties. The cascade is a total order, so equal inputs always produce the
/// same orientation.
fn choose_orientation(
    forward: &DirectionTotals,
    reverse: &DirectionTotals,
    margin: f64,
) -> Orientation {
    if (forward.log_lr - reverse.log_lr).abs() < margin {
        if forward.excluded != reverse.excluded {
            return if forward.excluded < reverse.excluded {
                Orientation::CandidateParent
            } else {
                Orientation::CandidateChild
            };
        }
        if forward.consistent != reverse.consistent {
            return if forward.consistent > reverse.consistent {
                Orientation::CandidateParent
            } else {
                Orientation::CandidateChild
            };
        }
        if forward.mutated != reverse.mutated {
            return if forward.mutated < reverse.mutated {
                Orientation::CandidateParent
            } else {
                Orientation::CandidateChild
            };
        }
    }
    if forward.log_lr >= reverse.log_lr {
        Orientation::CandidateParent
    } else {
        Orientation::CandidateChild
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genotype::AlleleKey;
    use crate::core::types::PersonId;
    use std::collections::HashMap;

    fn table(entries: &[(&str, f64)]) -> AlleleFrequencyTable {
        let mut per_locus = HashMap::new();
        for (allele, freq) in entries {
            per_locus.insert(AlleleKey::parse(allele).unwrap(), *freq);
        }
        AlleleFrequencyTable::new(vec![per_locus], 1e-4)
    }

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_shared_allele_heterozygous_parent() {
        let freqs = table(&[("13", 0.1), ("14", 0.2), ("15", 0.3)]);
        let child = Genotype::parse("13,14");
        let parent = Genotype::parse("14,15");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Consistent);
        // One shared allele (14): LR = 0.5 / 0.2 = 2.5
        assert!((result.log_lr - 2.5_f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_shared_allele_homozygous_parent_transmits_always() {
        let freqs = table(&[("13", 0.1)]);
        let child = Genotype::parse("13,14");
        let parent = Genotype::parse("13,13");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Consistent);
        // LR = 1.0 / 0.1 = 10
        assert!((result.log_lr - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_both_alleles_shared_uses_square_root() {
        let freqs = table(&[("13", 0.1), ("14", 0.2)]);
        let child = Genotype::parse("13,14");
        let parent = Genotype::parse("13,14");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Consistent);
        // sqrt(0.5/0.1 + 0.5/0.2) = sqrt(7.5)
        let expected = (0.5 / 0.1 + 0.5 / 0.2_f64).sqrt().log10();
        assert!((result.log_lr - expected).abs() < 1e-12);
    }

    #[test]
    fn test_common_allele_never_scores_negative() {
        // A very common shared allele would give LR < 1; it is floored to 1
        let freqs = table(&[("13", 0.9)]);
        let child = Genotype::parse("13,14");
        let parent = Genotype::parse("13,15");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Consistent);
        assert!((result.log_lr - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_added_shared_locus_never_lowers_log_lr() {
        let alleles: &[(&str, f64)] =
            &[("13", 0.1), ("14", 0.2), ("15", 0.3), ("16", 0.9)];
        let short = uniform_table(1, alleles);
        let long = uniform_table(2, alleles);

        let base = evaluate_pair(
            &profile("Q", &["13,14"]),
            &profile("C", &["14,15"]),
            &short,
            &config(),
        );

        // Sharing a very common allele at the extra locus floors to zero
        // contribution, never below
        let common = evaluate_pair(
            &profile("Q", &["13,14", "16,13"]),
            &profile("C", &["14,15", "16,15"]),
            &long,
            &config(),
        );
        assert!(common.log_lr >= base.log_lr - 1e-12);
        assert_eq!(common.consistent, base.consistent + 1);

        // Sharing a rarer allele strictly raises the total
        let rare = evaluate_pair(
            &profile("Q", &["13,14", "13,14"]),
            &profile("C", &["14,15", "14,16"]),
            &long,
            &config(),
        );
        assert!(rare.log_lr > base.log_lr);
    }

    #[test]
    fn test_single_step_mutation() {
        let freqs = table(&[("13", 0.1), ("14", 0.2)]);
        let child = Genotype::parse("13,13");
        let parent = Genotype::parse("14,14");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Mutation);
        // Homozygous parent: 0.002 * 1.3 / 0.1
        let expected = (0.002 * 1.3 / 0.1_f64).log10();
        assert!((result.log_lr - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_prefers_best_pair() {
        let freqs = table(&[("13", 0.01), ("15", 0.3), ("14", 0.2), ("16", 0.2)]);
        let child = Genotype::parse("13,15");
        let parent = Genotype::parse("14,16");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Mutation);
        // Candidate pairs: 13-14 (rate/0.01), 15-14 (rate/0.3), 15-16 (rate/0.3)
        let expected = (0.002 * 1.6 / 0.01_f64).log10();
        assert!((result.log_lr - expected).abs() < 1e-12);
    }

    #[test]
    fn test_exclusion() {
        let freqs = table(&[("13", 0.1), ("18", 0.1)]);
        let child = Genotype::parse("13,13");
        let parent = Genotype::parse("18,18");
        let result = compare_locus(&child, &parent, &freqs, 0, &config());
        assert_eq!(result.call, LocusCall::Exclusion);
        assert!((result.log_lr - (-6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_is_neutral() {
        let freqs = table(&[("13", 0.1)]);
        let child = Genotype::parse("13,14");
        let missing = Genotype::missing();
        for (a, b) in [(&child, &missing), (&missing, &child), (&missing, &missing)] {
            let result = compare_locus(a, b, &freqs, 0, &config());
            assert_eq!(result.call, LocusCall::Missing);
            assert!((result.log_lr - 0.0).abs() < 1e-12);
        }
    }

    fn profile(id: &str, cells: &[&str]) -> Profile {
        Profile::new(
            PersonId::new(id),
            cells.iter().map(|c| Genotype::parse(c)).collect(),
        )
    }

    fn uniform_table(loci: usize, alleles: &[(&str, f64)]) -> AlleleFrequencyTable {
        let per_locus: HashMap<AlleleKey, f64> = alleles
            .iter()
            .map(|(a, f)| (AlleleKey::parse(a).unwrap(), *f))
            .collect();
        AlleleFrequencyTable::new(vec![per_locus; loci], 1e-4)
    }

    #[test]
    fn test_evaluate_pair_counts() {
        let freqs = uniform_table(
            4,
            &[("13", 0.1), ("14", 0.2), ("15", 0.3), ("18", 0.1), ("20", 0.1)],
        );
        let query = profile("Q", &["13,14", "13,13", "18,18", "-"]);
        let candidate = profile("C", &["14,15", "14,14", "20,20", "13"]);
        let result = evaluate_pair(&query, &candidate, &freqs, &config());
        assert_eq!(result.consistent, 1);
        assert_eq!(result.mutated, 1);
        assert_eq!(result.excluded, 1);
        assert_eq!(result.missing, 1);
    }

    #[test]
    fn test_identical_profiles_penalized() {
        let cells = [
            "13,14", "9,9.3", "20,22", "15,16", "11,12", "28,30", "6,7", "13,15",
        ];
        let freqs = uniform_table(
            8,
            &[
                ("13", 0.1),
                ("14", 0.1),
                ("9", 0.1),
                ("9.3", 0.1),
                ("20", 0.1),
                ("22", 0.1),
                ("15", 0.1),
                ("16", 0.1),
                ("11", 0.1),
                ("12", 0.1),
                ("28", 0.1),
                ("30", 0.1),
                ("6", 0.1),
                ("7", 0.1),
            ],
        );
        let query = profile("Q", &cells);
        let twin = profile("T", &cells);
        // Same genotypes, but only one shared allele per locus
        let child = profile(
            "C",
            &[
                "13,20", "9,22", "20,13", "15,9", "11,28", "28,6", "6,11", "15,20",
            ],
        );

        let twin_eval = evaluate_pair(&query, &twin, &freqs, &config());
        let child_eval = evaluate_pair(&query, &child, &freqs, &config());

        // Every locus identical: the shared-genotype penalty caps out, so
        // the twin scores below a plausible child sharing one allele per locus
        assert!(twin_eval.log_lr < child_eval.log_lr);
    }

    #[test]
    fn test_orientation_prefers_higher_log_lr() {
        let mut forward = DirectionTotals::default();
        let mut reverse = DirectionTotals::default();
        forward.log_lr = 10.0;
        reverse.log_lr = 2.0;
        assert_eq!(
            choose_orientation(&forward, &reverse, 2.5),
            Orientation::CandidateParent
        );
        forward.log_lr = 2.0;
        reverse.log_lr = 10.0;
        assert_eq!(
            choose_orientation(&forward, &reverse, 2.5),
            Orientation::CandidateChild
        );
    }

    #[test]
    fn test_orientation_margin_prefers_fewer_exclusions() {
        let forward = DirectionTotals {
            log_lr: 5.0,
            excluded: 2,
            ..Default::default()
        };
        let reverse = DirectionTotals {
            log_lr: 4.0,
            excluded: 0,
            ..Default::default()
        };
        // Inside the margin the exclusion count outranks the higher LR
        assert_eq!(
            choose_orientation(&forward, &reverse, 2.5),
            Orientation::CandidateChild
        );
        // Outside the margin the LR decides
        assert_eq!(
            choose_orientation(&forward, &reverse, 0.5),
            Orientation::CandidateParent
        );
    }

    #[test]
    fn test_orientation_exact_tie_is_candidate_parent() {
        let forward = DirectionTotals {
            log_lr: 5.0,
            ..Default::default()
        };
        let reverse = DirectionTotals {
            log_lr: 5.0,
            ..Default::default()
        };
        assert_eq!(
            choose_orientation(&forward, &reverse, 2.5),
            Orientation::CandidateParent
        );
    }
}
