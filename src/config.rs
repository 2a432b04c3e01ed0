//! Application constants and environment-derived configuration.

use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "Docparse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the service base URL.
pub const API_URL_ENV: &str = "DOCPARSE_API_URL";
/// Service base URL when the environment does not override it.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Virtual path of the login view.
pub const LOGIN_PATH: &str = "/login";
/// Landing path after a login that captured no redirect.
pub const DEFAULT_LANDING_PATH: &str = "/";

/// Cookie the service uses to deliver the anti-forgery token.
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header the anti-forgery token is echoed back on.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Upload requests are bounded; anything slower is reported as a timeout.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Service base URL, `DOCPARSE_API_URL` or the default, without a
/// trailing slash.
pub fn api_base_url() -> String {
    let url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    url.trim_end_matches('/').to_string()
}

/// Get the application data directory (`~/.docparse`).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(".docparse")
}

/// File holding the persisted credential across restarts.
pub fn credential_file() -> PathBuf {
    app_data_dir().join("credential")
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "docparse_client=info"
}

/// Per-client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, no trailing slash.
    pub base_url: String,
    /// Deadline applied to document uploads.
    pub upload_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for a specific service URL with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_base_url(api_base_url())
    }
}
