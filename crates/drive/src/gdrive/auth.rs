//! Google Drive OAuth2 authentication
//!
//! Authorization code flow for an installed app: the consent page redirects
//! to a loopback listener, the code is exchanged for tokens, and tokens are
//! cached in the config directory. Uses synchronous HTTP (ureq).

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};

/// Token cache file name in the config directory
const TOKEN_FILE: &str = "token.json";

/// Tokens expiring within this many seconds are refreshed first
const EXPIRY_MARGIN_SECS: i64 = 300;

/// OAuth2 configuration and token management for Drive
pub struct DriveAuth {
    client_id: String,
    client_secret: String,
    token_path: PathBuf,
}

/// Token data cached on disk
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    expires_at: Option<i64>,
}

impl StoredToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now + EXPIRY_MARGIN_SECS)
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl DriveAuth {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read-only access is enough to list and export
    const DRIVE_READONLY_SCOPE: &'static str = "https://www.googleapis.com/auth/drive.readonly";

    /// Ports tried for the loopback callback listener
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a DriveAuth caching tokens in the config directory
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let token_path =
            config::config_path(TOKEN_FILE).context("Could not determine config directory")?;
        Ok(Self::with_token_path(client_id, client_secret, token_path))
    }

    /// Create a DriveAuth caching tokens at an explicit path
    pub fn with_token_path(client_id: String, client_secret: String, token_path: PathBuf) -> Self {
        Self {
            client_id,
            client_secret,
            token_path,
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn get_access_token(&self) -> Result<String> {
        if let Ok(token) = self.load_token() {
            if token.is_fresh(Utc::now().timestamp()) {
                return Ok(token.access_token);
            }

            if let Some(refresh_token) = token.refresh_token {
                match self.refresh_access_token(&refresh_token) {
                    Ok(new_token) => {
                        self.save_token(&new_token)?;
                        return Ok(new_token.access_token);
                    }
                    Err(e) => log::warn!("Token refresh failed, re-authenticating: {:#}", e),
                }
            }
        }

        let token = self.authorization_code_auth()?;
        self.save_token(&token)?;
        Ok(token.access_token)
    }

    /// Check if a usable token is cached
    pub fn is_authenticated(&self) -> bool {
        match self.load_token() {
            Ok(token) if token.is_fresh(Utc::now().timestamp()) => true,
            Ok(token) => token
                .refresh_token
                .is_some_and(|refresh| self.refresh_access_token(&refresh).is_ok()),
            Err(_) => false,
        }
    }

    /// Forget cached tokens
    pub fn logout(&self) -> Result<()> {
        if self.token_path.exists() {
            std::fs::remove_file(&self.token_path)
                .with_context(|| format!("Failed to remove {}", self.token_path.display()))?;
        }
        Ok(())
    }

    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(Self::DRIVE_READONLY_SCOPE),
        );

        println!("\n=== Google Drive Authentication Required ===");
        println!("If the browser doesn't open, visit: {}", auth_url);
        if let Err(e) = open::that(&auth_url) {
            log::warn!("Failed to open browser: {}", e);
        }

        println!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        println!("Authentication successful!\n");
        Ok(token)
    }

    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        (Self::PORT_RANGE_START..=Self::PORT_RANGE_END)
            .find_map(|port| {
                TcpListener::bind(("127.0.0.1", port))
                    .ok()
                    .map(|listener| (listener, port))
            })
            .with_context(|| {
                format!(
                    "Could not bind to any port in range {}-{}",
                    Self::PORT_RANGE_START,
                    Self::PORT_RANGE_END
                )
            })
    }

    /// Accept the redirect and pull the authorization code out of it
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut request_line = String::new();
        BufReader::new(&stream)
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        let code = query_param(&request_line, "code");
        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = query_param(&request_line, "error") {
            bail!("OAuth error: {}", err);
        }
        code.context("No authorization code received")
    }

    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Google omits the refresh token on refresh; keep the old one
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    fn load_token(&self) -> Result<StoredToken> {
        config::load_json_file(&self.token_path)
    }

    fn save_token(&self, token: &TokenResponse) -> Result<()> {
        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs as i64),
        };
        config::save_json_file(&self.token_path, &stored)
    }
}

/// Extract a query parameter from an HTTP request line
/// (`GET /?code=abc&scope=... HTTP/1.1`)
fn query_param(request_line: &str, key: &str) -> Option<String> {
    let target = request_line.split_whitespace().nth(1)?;
    let (_, query) = target.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| {
            urlencoding::decode(v)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| v.to_string())
        })
    })
}
