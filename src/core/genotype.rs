/// Allele values are stored in tenths of a repeat unit, so one-decimal
/// microvariants like 9.3 are exact and comparisons never touch floats.
const TENTHS_PER_REPEAT: i64 = 10;

/// A single STR allele, quantized to a tenth of a repeat unit.
///
/// `9.3` becomes key 93, `13` becomes key 130. Quantization makes allele
/// equality and the one-step mutation test exact integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlleleKey(i64);

impl AlleleKey {
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((value * 10.0).round() as i64)
    }

    /// Parse a single allele token (e.g. `"13"`, `"9.3"`)
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let value: f64 = token.trim().parse().ok()?;
        if value.is_finite() {
            Some(Self::from_value(value))
        } else {
            None
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.0 as f64 / 10.0
        }
    }

    /// True when the two alleles are exactly one repeat unit apart,
    /// the single-step mutation pattern (e.g. 13 vs 14, 9.3 vs 10.3)
    #[must_use]
    pub fn is_single_step(self, other: Self) -> bool {
        (self.0 - other.0).abs() == TENTHS_PER_REPEAT
    }

    /// The two alleles one repeat unit up and down from this one
    #[must_use]
    pub fn step_neighbors(self) -> [Self; 2] {
        [
            Self(self.0 - TENTHS_PER_REPEAT),
            Self(self.0 + TENTHS_PER_REPEAT),
        ]
    }
}

impl std::fmt::Display for AlleleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0.div_euclid(10);
        let tenth = self.0.rem_euclid(10);
        if tenth == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{tenth}")
        }
    }
}

/// The set of distinct alleles one person carries at one locus.
///
/// Empty means the locus was not typed. A single allele means the person is
/// homozygous (or only one allele was recorded). Alleles are kept sorted, so
/// the canonical form is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genotype {
    alleles: Vec<AlleleKey>,
}

impl Genotype {
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Build from raw allele keys, deduplicating and sorting.
    /// `13,13` and `13` produce the same homozygous genotype.
    #[must_use]
    pub fn from_alleles(mut alleles: Vec<AlleleKey>) -> Self {
        alleles.sort_unstable();
        alleles.dedup();
        Self { alleles }
    }

    /// Parse a genotype cell.
    ///
    /// Handles `"13,14"`, `"13"`, `"13,13"`, `"9.3"`, and the missing-data
    /// sentinels `"-"` and `""`. Non-numeric tokens are dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "-" {
            return Self::missing();
        }
        let alleles = trimmed
            .split(',')
            .filter_map(AlleleKey::parse)
            .collect::<Vec<_>>();
        Self::from_alleles(alleles)
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.alleles.is_empty()
    }

    /// A single distinct allele is treated as homozygous
    #[must_use]
    pub fn is_homozygous(&self) -> bool {
        self.alleles.len() == 1
    }

    #[must_use]
    pub fn allele_count(&self) -> usize {
        self.alleles.len()
    }

    #[must_use]
    pub fn alleles(&self) -> &[AlleleKey] {
        &self.alleles
    }

    #[must_use]
    pub fn contains(&self, allele: AlleleKey) -> bool {
        self.alleles.contains(&allele)
    }

    /// Alleles present in both genotypes, in sorted order
    #[must_use]
    pub fn shared_alleles(&self, other: &Self) -> Vec<AlleleKey> {
        self.alleles
            .iter()
            .copied()
            .filter(|a| other.contains(*a))
            .collect()
    }

    /// True when some allele pair across the two genotypes is one repeat
    /// unit apart
    #[must_use]
    pub fn has_single_step_pair(&self, other: &Self) -> bool {
        self.alleles
            .iter()
            .any(|a| other.alleles.iter().any(|b| a.is_single_step(*b)))
    }

    /// Canonical cell form: sorted alleles joined with commas, `-` if missing
    #[must_use]
    pub fn canonical(&self) -> String {
        if self.is_missing() {
            return "-".to_string();
        }
        self.alleles
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for Genotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
