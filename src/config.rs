//! Configuration management for the Instagram follow engine.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. It provides a centralized way to
//! manage application configuration including API endpoints, session
//! credentials, and request behavior.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (endpoints and timeouts)
//!
//! Credentials have no defaults: they come from the environment, the CLI, or
//! the persisted session cache.

use dotenv;
use std::{env, path::PathBuf};

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `gramfollow/.env`. This allows users to store
/// configuration securely without hardcoding sensitive values.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/gramfollow/.env`
/// - macOS: `~/Library/Application Support/gramfollow/.env`
/// - Windows: `%LOCALAPPDATA%/gramfollow/.env`
///
/// A missing `.env` file is not an error; every endpoint has a built-in
/// default and credentials may arrive via the CLI instead.
///
/// # Returns
///
/// Returns `Ok(())` if the environment is ready, or an error string if the
/// parent directory cannot be created.
///
/// # Example
///
/// ```
/// use gramfollow::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("gramfollow/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    dotenv::from_path(path).ok();
    Ok(())
}

/// Returns the base URL of the mobile private API.
///
/// Retrieves the `INSTAGRAM_API_URL` environment variable, falling back to
/// the real mobile endpoint. All session-authenticated operations (login,
/// liveness, lookups, follows) go through this host.
///
/// # Example
///
/// ```
/// let url = api_url(); // "https://i.instagram.com/api/v1"
/// ```
pub fn api_url() -> String {
    env::var("INSTAGRAM_API_URL").unwrap_or_else(|_| "https://i.instagram.com/api/v1".to_string())
}

/// Returns the base URL of the web API.
///
/// Retrieves the `INSTAGRAM_WEB_URL` environment variable, falling back to
/// the public web host. Only the web-profile lookup fallback uses this
/// surface; it requires the public app id header instead of a bearer token.
///
/// # Example
///
/// ```
/// let url = web_url(); // "https://www.instagram.com/api/v1"
/// ```
pub fn web_url() -> String {
    env::var("INSTAGRAM_WEB_URL").unwrap_or_else(|_| "https://www.instagram.com/api/v1".to_string())
}

/// Returns the application id sent with web API requests.
///
/// Retrieves the `INSTAGRAM_APP_ID` environment variable, falling back to the
/// id the web client itself advertises. Sent as `X-IG-App-ID`.
pub fn app_id() -> String {
    env::var("INSTAGRAM_APP_ID").unwrap_or_else(|_| "936619743392459".to_string())
}

/// Returns the per-request timeout in seconds.
///
/// Retrieves the `GRAMFOLLOW_REQUEST_TIMEOUT` environment variable, falling
/// back to 30 seconds. Applies to every individual API call; the engine's
/// pacing waits are separate and much longer.
pub fn request_timeout_secs() -> u64 {
    env::var("GRAMFOLLOW_REQUEST_TIMEOUT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30)
}

/// Returns the session token from the environment, if configured.
///
/// Reads `INSTAGRAM_SESSION_ID`. Preferred over password login when present.
pub fn session_id() -> Option<String> {
    env::var("INSTAGRAM_SESSION_ID").ok().filter(|v| !v.is_empty())
}

/// Returns the account username from the environment, if configured.
///
/// Reads `INSTAGRAM_USERNAME`. Used together with [`password`] as the
/// fallback when no session token is available or the token is rejected.
pub fn username() -> Option<String> {
    env::var("INSTAGRAM_USERNAME").ok().filter(|v| !v.is_empty())
}

/// Returns the account password from the environment, if configured.
///
/// Reads `INSTAGRAM_PASSWORD`. Never logged.
pub fn password() -> Option<String> {
    env::var("INSTAGRAM_PASSWORD").ok().filter(|v| !v.is_empty())
}

/// Returns a fixed android device id from the environment, if configured.
///
/// Reads `GRAMFOLLOW_ANDROID_ID`. When absent the id is derived from the
/// account seed so the same account keeps presenting the same device.
pub fn android_id_override() -> Option<String> {
    env::var("GRAMFOLLOW_ANDROID_ID").ok().filter(|v| !v.is_empty())
}
