use std::collections::HashSet;

use log::debug;

use super::fingerprint::record_fingerprint;
use crate::reconcile::ReconciledRecord;

/// In-memory set of fingerprints for one logical table.
///
/// Built once per run from the persisted snapshot so each candidate costs a
/// hash lookup instead of a store round-trip.
#[derive(Debug, Clone)]
pub struct DuplicateIndex {
    fields: Vec<&'static str>,
    fingerprints: HashSet<String>,
}

impl DuplicateIndex {
    pub fn build<'a, I>(fields: &[&'static str], existing: I) -> Self
    where
        I: IntoIterator<Item = &'a ReconciledRecord>,
    {
        let fingerprints: HashSet<String> = existing
            .into_iter()
            .map(|record| record_fingerprint(record, fields))
            .collect();
        debug!("Duplicate index built with {} entries", fingerprints.len());
        Self {
            fields: fields.to_vec(),
            fingerprints,
        }
    }

    pub fn fingerprint(&self, record: &ReconciledRecord) -> String {
        record_fingerprint(record, &self.fields)
    }

    pub fn is_duplicate(&self, record: &ReconciledRecord) -> bool {
        self.fingerprints.contains(&self.fingerprint(record))
    }

    /// Returns `false` if the fingerprint was already present.
    pub fn insert(&mut self, fingerprint: String) -> bool {
        self.fingerprints.insert(fingerprint)
    }

    /// Returns the fingerprint for a new record, or `None` for a duplicate.
    ///
    /// New records are added to the index, so repeats within one batch are
    /// caught as well.
    pub fn check_and_insert(&mut self, record: &ReconciledRecord) -> Option<String> {
        let fingerprint = self.fingerprint(record);
        self.fingerprints
            .insert(fingerprint.clone())
            .then_some(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
