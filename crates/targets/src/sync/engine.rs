//! Mutation and refresh orchestration

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{info, warn};

use crate::cache::TargetCache;
use crate::models::{RecordState, TargetChanges, TargetId, TargetSummary, display_date};
use crate::vws::api::TargetSummaryResponse;
use crate::vws::{VwsClient, VwsError};

/// Statistics from a full cache rebuild
#[derive(Debug, Default, Clone)]
pub struct RefreshStats {
    /// Ids returned by the list endpoint
    pub targets_listed: usize,
    /// Records refreshed and appended
    pub targets_refreshed: usize,
    /// Per-id fetches that failed
    pub errors: usize,
    /// Duration of the rebuild
    pub duration_ms: u64,
}

/// Unified result of a mutation
///
/// Upload, update, and delete all report through this one shape; the raw
/// response text of the update contract is retained inside `Applied`.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The server accepted the mutation. `response` is the raw body text
    /// (the fixed `"Deleted"` marker for deletes).
    Applied { response: String },
    /// The create pre-check found the name already in the cache; no network
    /// call was made.
    NameConflict,
    /// The call failed. The error keeps status/body detail for callers that
    /// want to branch on it.
    Failed(VwsError),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}

/// Orchestrates mutations and cache refreshes
///
/// Mutations call the service first and refresh the local record after, so
/// the server stays the source of truth. A single logical caller is
/// assumed; wrap the engine in a mutex if the host issues calls from
/// several threads.
pub struct SyncEngine {
    client: VwsClient,
    cache: Arc<TargetCache>,
}

impl SyncEngine {
    pub fn new(client: VwsClient, cache: Arc<TargetCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &TargetCache {
        &self.cache
    }

    pub fn client(&self) -> &VwsClient {
        &self.client
    }

    /// Register a new target and mirror it locally.
    ///
    /// The name check is advisory and case-insensitive: a concurrent
    /// external create with the same name can still pass the server.
    pub fn upload_target(
        &self,
        name: &str,
        width: f32,
        image: &[u8],
        active: bool,
        metadata: &[u8],
    ) -> MutationOutcome {
        if self.cache.contains_name(name) {
            info!("target name '{}' already taken, refusing upload", name);
            return MutationOutcome::NameConflict;
        }

        let (id, response) = match self.client.create_target(name, width, image, active, metadata) {
            Ok(created) => created,
            Err(err) => return MutationOutcome::Failed(err),
        };
        info!("created target {}", id.as_str());

        // Placeholder slot until the refresh below resolves it.
        self.cache.push(TargetSummary::unresolved(id.clone()));
        self.refresh_one(&id);

        MutationOutcome::Applied { response }
    }

    /// Apply a partial update, then refresh the affected record.
    pub fn update_target(&self, id: &TargetId, changes: &TargetChanges) -> MutationOutcome {
        let response = match self.client.update_target(id, changes) {
            Ok(text) => text,
            Err(err) => return MutationOutcome::Failed(err),
        };
        info!("updated target {}", id.as_str());
        self.refresh_one(id);
        MutationOutcome::Applied { response }
    }

    /// Delete a target and drop it from the cache.
    ///
    /// The record is removed outright on a confirmed delete rather than
    /// refreshed into an unresolved placeholder. A failed delete leaves the
    /// cache untouched.
    pub fn delete_target(&self, id: &TargetId) -> MutationOutcome {
        let response = match self.client.delete_target(id) {
            Ok(marker) => marker,
            Err(err) => return MutationOutcome::Failed(err),
        };
        info!("deleted target {}", id.as_str());
        self.cache.take(id);
        MutationOutcome::Applied { response }
    }

    /// Refresh one record in place.
    ///
    /// An existing record keeps its index whether the fetch succeeds or
    /// not; an id the cache has not seen is appended at the end. On a
    /// failed fetch the slot receives an unresolved placeholder instead of
    /// confirmed data.
    pub fn refresh_one(&self, id: &TargetId) -> RecordState {
        let slot = self.cache.take(id).map(|(index, _)| index);

        let record = match self.client.get_target_summary(id) {
            Ok(summary) => confirmed_record(id.clone(), &summary),
            Err(err) => {
                warn!("refresh of target {} failed: {}", id.as_str(), err);
                TargetSummary::unresolved(id.clone())
            }
        };
        let state = record.state;

        match slot {
            Some(index) => self.cache.insert_at(index, record),
            None => self.cache.push(record),
        }
        state
    }

    /// Rebuild the whole cache from the remote store.
    ///
    /// `observer` receives `(completed, total, current_name)` after each
    /// successful summary fetch; it is informational only and cannot affect
    /// the outcome. Failed per-id fetches are counted and skipped.
    pub fn refresh_all<F>(&self, mut observer: F) -> Result<RefreshStats>
    where
        F: FnMut(usize, usize, &str),
    {
        let start = Instant::now();
        let mut stats = RefreshStats::default();

        let ids = self.client.list_targets()?;
        stats.targets_listed = ids.len();

        self.cache.clear();
        for id in &ids {
            match self.client.get_target_summary(id) {
                Ok(summary) => {
                    let record = confirmed_record(id.clone(), &summary);
                    stats.targets_refreshed += 1;
                    observer(stats.targets_refreshed, ids.len(), &record.target_name);
                    self.cache.push(record);
                }
                Err(err) => {
                    warn!("summary fetch for {} failed: {}", id.as_str(), err);
                    stats.errors += 1;
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "cache rebuilt: {} of {} targets",
            stats.targets_refreshed, stats.targets_listed
        );
        Ok(stats)
    }
}

/// Build a confirmed cache record from a summary response, applying the
/// date display rewrite. Summary responses carry no width or metadata.
fn confirmed_record(id: TargetId, summary: &TargetSummaryResponse) -> TargetSummary {
    TargetSummary {
        target_id: id,
        target_name: summary.target_name.clone(),
        width: 0.0,
        active: summary.active_flag,
        status: summary.status.clone(),
        upload_date: display_date(&summary.upload_date),
        metadata: Vec::new(),
        state: RecordState::Confirmed,
    }
}
