//! Credential loading for the VWS client
//!
//! Supports loading credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (~/.config/targetdesk/vws-credentials.json)
//! 3. Runtime environment variables (fallback)
//!
//! The client takes the resulting [`VwsCredentials`] value explicitly; there
//! is no global credential state.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the Targetdesk config directory
const CREDENTIALS_FILE: &str = "vws-credentials.json";

/// Default service origin
pub const DEFAULT_BASE_URL: &str = "https://vws.vuforia.com";

/// Access credentials and service origin for one VWS account
#[derive(Debug, Clone)]
pub struct VwsCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub base_url: String,
}

/// Credential file format
#[derive(Deserialize)]
struct CredentialFile {
    access_key: String,
    secret_key: String,
    base_url: Option<String>,
}

impl VwsCredentials {
    /// Credentials against the default service origin.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the credentials at a different origin (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. JSON file (~/.config/targetdesk/vws-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let file: CredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Ok(Self::from_credential_file(file));
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: TARGETDESK_ACCESS_KEY=xxx TARGETDESK_SECRET_KEY=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let access_key = option_env!("TARGETDESK_ACCESS_KEY")?;
        let secret_key = option_env!("TARGETDESK_SECRET_KEY")?;

        // Only return if both are non-empty
        if access_key.is_empty() || secret_key.is_empty() {
            return None;
        }

        Some(Self::new(access_key, secret_key))
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: CredentialFile = config::load_json_file(path)?;
        Ok(Self::from_credential_file(file))
    }

    fn from_credential_file(file: CredentialFile) -> Self {
        Self {
            access_key: file.access_key,
            secret_key: file.secret_key,
            base_url: file.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Ok(Self::from_credential_file(file))
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let access_key = std::env::var("VWS_ACCESS_KEY")
            .context("VWS_ACCESS_KEY environment variable not set")?;
        let secret_key = std::env::var("VWS_SECRET_KEY")
            .context("VWS_SECRET_KEY environment variable not set")?;
        let base_url =
            std::env::var("VWS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            access_key,
            secret_key,
            base_url,
        })
    }

    /// Get the default credentials file path (~/.config/targetdesk/vws-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if credentials are available (compile-time, file, or env vars)
    pub fn is_available() -> bool {
        if Self::from_compile_time().is_some() {
            return true;
        }
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        std::env::var("VWS_ACCESS_KEY").is_ok() && std::env::var("VWS_SECRET_KEY").is_ok()
    }
}
