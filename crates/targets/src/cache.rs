//! In-memory mirror of target records
//!
//! Insertion-ordered collection holding exactly one record per target id.
//! The sync engine is the only writer; the lock keeps shared read access
//! safe when the host hands the cache to other threads. Persistence stays
//! with the host through the [`TargetCache::load`] / [`TargetCache::export`]
//! snapshot hooks.

use std::sync::RwLock;

use crate::models::{TargetId, TargetSummary};

/// Ordered mirror of the account's targets
pub struct TargetCache {
    records: RwLock<Vec<TargetSummary>>,
}

impl TargetCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Replace the contents with a previously exported snapshot.
    pub fn load(&self, records: Vec<TargetSummary>) {
        *self.records.write().unwrap() = records;
    }

    /// Clone the contents for the external snapshot collaborator.
    pub fn export(&self) -> Vec<TargetSummary> {
        self.records.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    /// Record with this id, if present.
    pub fn get(&self, id: &TargetId) -> Option<TargetSummary> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| &r.target_id == id)
            .cloned()
    }

    /// Index of the record with this id, if present.
    pub fn position(&self, id: &TargetId) -> Option<usize> {
        self.records
            .read()
            .unwrap()
            .iter()
            .position(|r| &r.target_id == id)
    }

    /// Remove the record with this id, returning it with the index it
    /// occupied.
    pub fn take(&self, id: &TargetId) -> Option<(usize, TargetSummary)> {
        let mut records = self.records.write().unwrap();
        let index = records.iter().position(|r| &r.target_id == id)?;
        Some((index, records.remove(index)))
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_at(&self, index: usize, record: TargetSummary) {
        let mut records = self.records.write().unwrap();
        let index = index.min(records.len());
        records.insert(index, record);
    }

    /// Append at the end.
    pub fn push(&self, record: TargetSummary) {
        self.records.write().unwrap().push(record);
    }

    /// All names, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.records
            .read()
            .unwrap()
            .iter()
            .map(|r| r.target_name.clone())
            .collect()
    }

    /// Case-insensitive name membership test used by the create pre-check.
    pub fn contains_name(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        self.records
            .read()
            .unwrap()
            .iter()
            .any(|r| r.target_name.to_lowercase() == needle)
    }
}

impl Default for TargetCache {
    fn default() -> Self {
        Self::new()
    }
}
