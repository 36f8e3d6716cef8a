//! Domain models for target entities

mod target;

pub use target::{
    RecordState, TargetChanges, TargetId, TargetSummary, UNRESOLVED_NAME, display_date,
};
