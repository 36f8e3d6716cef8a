//! Sync engine keeping the local cache consistent with the remote store
//!
//! Every mutation runs server-first, then refreshes the affected record;
//! a full rebuild repopulates the cache from scratch.

mod engine;

pub use engine::{MutationOutcome, RefreshStats, SyncEngine};
