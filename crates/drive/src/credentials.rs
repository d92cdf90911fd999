//! OAuth client credentials for the Drive API
//!
//! Loaded from (in order of priority):
//! 1. Compile-time embedded credentials (for release builds)
//! 2. `credentials.json` in the config directory (Google Cloud Console format)
//! 3. Runtime environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials file name in the config directory
const CREDENTIALS_FILE: &str = "credentials.json";

const CLIENT_ID_ENV: &str = "DRIVE_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "DRIVE_CLIENT_SECRET";

/// OAuth client credentials for Drive API access
#[derive(Debug, Clone)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl DriveCredentials {
    /// Load credentials from the first available source
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }
        if config::config_exists(CREDENTIALS_FILE) {
            let file: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(file);
        }
        Self::from_env().with_context(|| {
            let path = Self::default_credentials_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| CREDENTIALS_FILE.to_string());
            format!("No Drive credentials found; place them at {}", path)
        })
    }

    /// Credentials embedded at build time:
    /// `GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release`
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(file)
    }

    /// Parse credentials from JSON (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(file)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var(CLIENT_ID_ENV)
            .with_context(|| format!("{} environment variable not set", CLIENT_ID_ENV))?;
        let client_secret = std::env::var(CLIENT_SECRET_ENV)
            .with_context(|| format!("{} environment variable not set", CLIENT_SECRET_ENV))?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Default credentials file location
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    fn from_credential_file(file: GoogleCredentialFile) -> Result<Self> {
        let section = file
            .installed
            .or(file.web)
            .context("Credentials file missing 'installed' or 'web' section")?;
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }
}
