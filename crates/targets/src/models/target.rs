//! Target model representing a managed image target

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Unique identifier for a target (server-assigned, immutable once created)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Display name carried by a record whose refresh has not resolved yet
pub const UNRESOLVED_NAME: &str = "New Target, Try Refresh";

/// Whether a cache record reflects confirmed server data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    /// Fields were populated from a successful summary fetch
    Confirmed,
    /// Placeholder slot; the summary fetch failed and should be retried
    Unresolved,
}

/// One managed image target mirrored from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSummary {
    pub target_id: TargetId,
    /// Unique within the account, compared case-insensitively
    pub target_name: String,
    /// Physical width in the unit chosen at upload
    pub width: f32,
    /// Recognition-enabled flag
    pub active: bool,
    /// Processing state as reported by the service
    pub status: String,
    /// Presented as MM/DD/YYYY once the record has been refreshed
    pub upload_date: String,
    /// Opaque application metadata (raw bytes; base64 on the wire)
    #[serde(default)]
    pub metadata: Vec<u8>,
    pub state: RecordState,
}

impl TargetSummary {
    /// Placeholder record for an id whose data is not confirmed yet.
    ///
    /// Carries a fixed display name and today's date; callers detect it via
    /// [`RecordState::Unresolved`], not by matching the name.
    pub fn unresolved(target_id: TargetId) -> Self {
        Self {
            target_id,
            target_name: UNRESOLVED_NAME.to_string(),
            width: 0.0,
            active: false,
            status: String::new(),
            upload_date: Local::now().format("%m/%d/%Y").to_string(),
            metadata: Vec::new(),
            state: RecordState::Unresolved,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.state == RecordState::Unresolved
    }
}

/// Partial update for an existing target
///
/// `width` and `active` are always sent; the optional fields are omitted
/// from the request body when absent.
#[derive(Debug, Clone, Default)]
pub struct TargetChanges {
    pub name: Option<String>,
    pub width: f32,
    pub image: Option<Vec<u8>>,
    pub active: bool,
    pub metadata: Option<Vec<u8>>,
}

/// Rewrite a server-side ISO date (`YYYY-MM-DD`) into the `MM/DD/YYYY`
/// display form.
///
/// Purely syntactic: the first ten characters are split on `-` and
/// rearranged, with no calendar validation. Input that does not have three
/// dash-separated fields passes through unchanged.
pub fn display_date(iso: &str) -> String {
    let date = iso.get(..10).unwrap_or(iso);
    let mut parts = date.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d)) if !y.is_empty() && !m.is_empty() && !d.is_empty() => {
            format!("{}/{}/{}", m, d, y)
        }
        _ => iso.to_string(),
    }
}
