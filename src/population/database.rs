use std::collections::HashMap;

use crate::core::profile::{LocusPanel, Profile};
use crate::core::types::PersonId;

/// An immutable population of STR profiles, positionally aligned to one
/// [`LocusPanel`].
///
/// The database is the unit the matching engine works against. Its content
/// fingerprint is computed once at construction and is what the
/// [`IndexService`](super::service::IndexService) keys index snapshots on:
/// equal fingerprints mean equal panel and cell content.
#[derive(Debug)]
pub struct ProfileDatabase {
    panel: LocusPanel,
    profiles: Vec<Profile>,
    id_to_row: HashMap<PersonId, usize>,
    fingerprint: String,
}

impl ProfileDatabase {
    #[must_use]
    pub fn from_profiles(panel: LocusPanel, profiles: Vec<Profile>) -> Self {
        let mut id_to_row = HashMap::with_capacity(profiles.len());
        for (row, profile) in profiles.iter().enumerate() {
            // First occurrence wins for duplicate ids
            id_to_row.entry(profile.id.clone()).or_insert(row);
        }
        let fingerprint = content_fingerprint(&panel, &profiles);
        Self {
            panel,
            profiles,
            id_to_row,
            fingerprint,
        }
    }

    #[must_use]
    pub fn panel(&self) -> &LocusPanel {
        &self.panel
    }

    #[must_use]
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    #[must_use]
    pub fn profile(&self, row: usize) -> &Profile {
        &self.profiles[row]
    }

    /// Look up a profile by person id
    #[must_use]
    pub fn get(&self, id: &PersonId) -> Option<&Profile> {
        self.id_to_row.get(id).map(|&row| &self.profiles[row])
    }

    /// MD5 over the panel and every normalized cell, in row order
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Hash the normalized content: the locus names, then one line per profile
/// with its id and canonical cells. Any cell edit, reorder, addition, or
/// removal changes the digest.
fn content_fingerprint(panel: &LocusPanel, profiles: &[Profile]) -> String {
    let mut context = md5::Context::new();
    context.consume(panel.names().join("|"));
    context.consume("\n");
    for profile in profiles {
        context.consume(profile.id.as_str());
        for genotype in profile.genotypes() {
            context.consume("|");
            context.consume(genotype.canonical());
        }
        context.consume("\n");
    }
    format!("{:x}", context.compute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genotype::Genotype;

    fn panel(names: &[&str]) -> LocusPanel {
        LocusPanel::new(names.iter().map(ToString::to_string).collect())
    }

    fn profile(id: &str, cells: &[&str]) -> Profile {
        Profile::new(
            PersonId::new(id),
            cells.iter().map(|c| Genotype::parse(c)).collect(),
        )
    }

    #[test]
    fn test_lookup_by_id() {
        let db = ProfileDatabase::from_profiles(
            panel(&["TH01", "FGA"]),
            vec![
                profile("P001", &["9,9.3", "20,22"]),
                profile("P002", &["6,7", "-"]),
            ],
        );
        assert_eq!(db.len(), 2);
        assert!(db.get(&PersonId::new("P001")).is_some());
        assert!(db.get(&PersonId::new("P999")).is_none());
    }

    #[test]
    fn test_fingerprint_stable_across_formatting() {
        // "13,13" and "13" normalize to the same genotype, so the
        // fingerprints agree
        let a = ProfileDatabase::from_profiles(
            panel(&["TH01"]),
            vec![profile("P001", &["13,13"])],
        );
        let b = ProfileDatabase::from_profiles(
            panel(&["TH01"]),
            vec![profile("P001", &["13"])],
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let base = ProfileDatabase::from_profiles(
            panel(&["TH01", "FGA"]),
            vec![profile("P001", &["9,9.3", "20,22"])],
        );
        let cell_changed = ProfileDatabase::from_profiles(
            panel(&["TH01", "FGA"]),
            vec![profile("P001", &["9,9.3", "20,23"])],
        );
        let row_added = ProfileDatabase::from_profiles(
            panel(&["TH01", "FGA"]),
            vec![
                profile("P001", &["9,9.3", "20,22"]),
                profile("P002", &["6", "-"]),
            ],
        );
        assert_ne!(base.fingerprint(), cell_changed.fingerprint());
        assert_ne!(base.fingerprint(), row_added.fingerprint());
    }
}
