use std::sync::{Arc, Mutex, PoisonError};

use super::database::ProfileDatabase;
use super::index::PopulationIndex;

/// Owns the current [`PopulationIndex`] snapshot and rebuilds it when the
/// database content changes.
///
/// Snapshots are keyed on the database content fingerprint. A caller always
/// gets a complete, internally consistent index: either the cached snapshot
/// (fingerprints match) or one rebuilt synchronously before the call
/// returns. Handing out `Arc` clones means a snapshot stays valid for as
/// long as a caller holds it, even after a newer one replaces it here.
#[derive(Debug)]
pub struct IndexService {
    min_frequency: f64,
    current: Mutex<Option<Arc<PopulationIndex>>>,
}

impl IndexService {
    #[must_use]
    pub fn new(min_frequency: f64) -> Self {
        Self {
            min_frequency,
            current: Mutex::new(None),
        }
    }

    /// Get an index snapshot for the database, rebuilding first if the
    /// cached one is missing or stale
    pub fn snapshot_for(&self, database: &ProfileDatabase) -> Arc<PopulationIndex> {
        let mut guard = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = guard.as_ref() {
            if cached.is_current_for(database) {
                tracing::debug!(
                    fingerprint = database.fingerprint(),
                    "reusing population index snapshot"
                );
                return Arc::clone(cached);
            }
            tracing::info!(
                old = cached.fingerprint(),
                new = database.fingerprint(),
                "database content changed, rebuilding population index"
            );
        } else {
            tracing::info!(
                profiles = database.len(),
                "building initial population index"
            );
        }

        let rebuilt = Arc::new(PopulationIndex::build(database, self.min_frequency));
        *guard = Some(Arc::clone(&rebuilt));
        rebuilt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genotype::Genotype;
    use crate::core::profile::{LocusPanel, Profile};
    use crate::core::types::PersonId;

    fn database(cells: &[(&str, &str)]) -> ProfileDatabase {
        let panel = LocusPanel::new(vec!["TH01".to_string()]);
        let profiles = cells
            .iter()
            .map(|(id, cell)| Profile::new(PersonId::new(*id), vec![Genotype::parse(cell)]))
            .collect();
        ProfileDatabase::from_profiles(panel, profiles)
    }

    #[test]
    fn test_snapshot_reused_for_same_content() {
        let service = IndexService::new(1e-4);
        let db = database(&[("P001", "9,9.3")]);

        let first = service.snapshot_for(&db);
        let second = service.snapshot_for(&db);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_snapshot_rebuilt_on_content_change() {
        let service = IndexService::new(1e-4);
        let before = database(&[("P001", "9,9.3")]);
        let after = database(&[("P001", "9,10")]);

        let first = service.snapshot_for(&before);
        let second = service.snapshot_for(&after);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.fingerprint(), second.fingerprint());

        // The old snapshot stays usable while a caller holds it
        assert_eq!(first.num_profiles(), 1);
    }

    #[test]
    fn test_equal_content_different_instances_share_snapshot() {
        let service = IndexService::new(1e-4);
        let a = database(&[("P001", "9,9.3")]);
        let b = database(&[("P001", "9.3,9")]);

        let first = service.snapshot_for(&a);
        let second = service.snapshot_for(&b);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
