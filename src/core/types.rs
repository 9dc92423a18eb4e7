use serde::{Deserialize, Serialize};

/// Unique identifier for a person in the profile database
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of comparing one locus between a putative parent and child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocusCall {
    /// At least one allele is shared between the two genotypes
    Consistent,
    /// No shared allele, but a pair one repeat unit apart exists
    Mutation,
    /// No shared allele and no single-step pair
    Exclusion,
    /// Either genotype is missing at this locus
    Missing,
}

/// Which side of a scored pair played the parent role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Candidate as parent, query as child
    CandidateParent,
    /// Query as parent, candidate as child
    CandidateChild,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CandidateParent => write!(f, "candidate_parent"),
            Self::CandidateChild => write!(f, "candidate_child"),
        }
    }
}

/// Confidence level for a reported match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    #[must_use]
    pub fn from_posterior(posterior: f64) -> Self {
        if posterior >= 0.9999 {
            Self::VeryHigh
        } else if posterior >= 0.99 {
            Self::High
        } else if posterior >= 0.9 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
