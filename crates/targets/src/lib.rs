//! Targets crate - Business logic for cloud image-target management
//!
//! This crate provides platform-independent target management functionality including:
//! - Domain models (TargetSummary, TargetId)
//! - VWS request signing and REST client
//! - In-memory target cache with snapshot hooks
//! - Sync engine keeping the cache consistent after every mutation
//!
//! This crate has zero UI dependencies; progress reporting stays with the
//! host through callbacks, and persistence stays with the host through the
//! cache's load/export hooks.

pub mod cache;
pub mod config;
pub mod models;
pub mod sync;
pub mod vws;

pub use cache::TargetCache;
pub use config::{DEFAULT_BASE_URL, VwsCredentials};
pub use models::{
    RecordState, TargetChanges, TargetId, TargetSummary, UNRESOLVED_NAME, display_date,
};
pub use sync::{MutationOutcome, RefreshStats, SyncEngine};
pub use vws::{CancelToken, DELETED_MARKER, VwsClient, VwsError, rfc1123_date, sign_request};
