use std::collections::HashMap;

use crate::core::genotype::Genotype;
use crate::core::types::PersonId;

/// The ordered set of STR loci a run works over.
///
/// Database and query profiles are stored positionally against one panel, so
/// locus names are resolved once at load time and matching is index-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusPanel {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl LocusPanel {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, by_name }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn name(&self, position: usize) -> &str {
        &self.names[position]
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// For each locus in `self`, the position of the same-named locus in
    /// `source`, or `None` when the source panel does not carry it
    #[must_use]
    pub fn projection_from(&self, source: &LocusPanel) -> Vec<Option<usize>> {
        self.names
            .iter()
            .map(|name| source.position(name))
            .collect()
    }
}

/// One person's STR profile, positionally aligned to a [`LocusPanel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: PersonId,
    genotypes: Vec<Genotype>,
}

impl Profile {
    #[must_use]
    pub fn new(id: PersonId, genotypes: Vec<Genotype>) -> Self {
        Self { id, genotypes }
    }

    #[must_use]
    pub fn genotype(&self, position: usize) -> &Genotype {
        &self.genotypes[position]
    }

    #[must_use]
    pub fn genotypes(&self) -> &[Genotype] {
        &self.genotypes
    }

    /// Number of loci with a recorded genotype
    #[must_use]
    pub fn typed_loci(&self) -> usize {
        self.genotypes.iter().filter(|g| !g.is_missing()).count()
    }

    /// Re-align this profile to another panel via a projection mapping
    /// (see [`LocusPanel::projection_from`]). Loci absent from the source
    /// come out missing.
    #[must_use]
    pub fn project(&self, mapping: &[Option<usize>]) -> Profile {
        let genotypes = mapping
            .iter()
            .map(|pos| match pos {
                Some(i) => self.genotypes[*i].clone(),
                None => Genotype::missing(),
            })
            .collect();
        Profile::new(self.id.clone(), genotypes)
    }
}
