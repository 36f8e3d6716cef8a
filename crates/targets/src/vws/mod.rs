//! Vuforia Web Services integration
//!
//! This module provides:
//! - Request signing (Content-MD5 + HMAC-SHA1 authorization tokens)
//! - REST client covering the target CRUD and query endpoints
//! - Wire-format request/response types

mod auth;
mod client;

pub use auth::{rfc1123_date, sign_request};
pub use client::{CancelToken, DELETED_MARKER, VwsClient, VwsError};

/// VWS API wire types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Body for POST /targets
    #[derive(Debug, Serialize)]
    pub struct CreateTargetRequest {
        pub name: String,
        pub width: f32,
        /// Base64-encoded image bytes
        pub image: String,
        pub active_flag: bool,
        /// Base64-encoded opaque metadata
        pub application_metadata: String,
    }

    /// Body for PUT /targets/{id}
    ///
    /// Absent optional fields are omitted rather than sent as null; width
    /// and active_flag are always sent.
    #[derive(Debug, Serialize)]
    pub struct UpdateTargetRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        pub width: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub image: Option<String>,
        pub active_flag: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub application_metadata: Option<String>,
    }

    /// Response from GET /targets
    #[derive(Debug, Deserialize)]
    pub struct TargetListResponse {
        pub result_code: String,
        pub transaction_id: String,
        pub results: Vec<String>,
    }

    /// Response from POST /targets
    #[derive(Debug, Deserialize)]
    pub struct CreateTargetResponse {
        pub result_code: String,
        pub transaction_id: String,
        pub target_id: String,
    }

    /// Response from GET /targets/{id}
    #[derive(Debug, Deserialize)]
    pub struct TargetRecordResponse {
        pub result_code: String,
        pub transaction_id: String,
        pub target_record: TargetRecord,
        pub status: String,
    }

    /// Full target record nested in the detail response
    #[derive(Debug, Deserialize)]
    pub struct TargetRecord {
        pub target_id: String,
        pub active_flag: bool,
        pub name: String,
        pub width: f32,
        #[serde(default)]
        pub tracking_rating: i32,
        #[serde(default)]
        pub reco_rating: String,
    }

    /// Response from GET /summary/{id}
    #[derive(Debug, Deserialize)]
    pub struct TargetSummaryResponse {
        pub result_code: String,
        pub transaction_id: String,
        #[serde(default)]
        pub database_name: String,
        pub target_name: String,
        pub upload_date: String,
        pub active_flag: bool,
        pub status: String,
        #[serde(default)]
        pub tracking_rating: i32,
        #[serde(default)]
        pub total_recos: u32,
        #[serde(default)]
        pub current_month_recos: u32,
        #[serde(default)]
        pub previous_month_recos: u32,
    }

    /// Response from GET /duplicates/{id}
    #[derive(Debug, Deserialize)]
    pub struct DuplicatesResponse {
        pub result_code: String,
        pub transaction_id: String,
        pub similar_targets: Vec<String>,
    }

    /// Response from GET /summary
    #[derive(Debug, Deserialize)]
    pub struct AccountSummaryResponse {
        pub result_code: String,
        pub transaction_id: String,
        pub name: String,
        pub active_images: u32,
        pub inactive_images: u32,
        pub failed_images: u32,
    }
}
