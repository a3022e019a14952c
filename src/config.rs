use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Solace";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP fallback backend (text/vision/transcription routes).
const DEFAULT_FALLBACK_BASE: &str = "https://solace-relief-backend.hf.space";

/// Default primary provider base URL.
const DEFAULT_PRIMARY_BASE: &str = "https://generativelanguage.googleapis.com";

/// Get the application data directory
/// ~/Solace/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// API key for the primary provider. Empty means "no primary tier" — the
/// pipeline then starts directly at the HTTP fallback.
pub fn primary_api_key() -> String {
    std::env::var("SOLACE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .unwrap_or_default()
}

/// Base URL of the primary provider (override for tests/self-hosted proxies).
pub fn primary_base_url() -> String {
    std::env::var("SOLACE_PRIMARY_URL").unwrap_or_else(|_| DEFAULT_PRIMARY_BASE.to_string())
}

/// Base URL of the HTTP fallback backend.
pub fn fallback_base_url() -> String {
    std::env::var("SOLACE_FALLBACK_URL").unwrap_or_else(|_| DEFAULT_FALLBACK_BASE.to_string())
}
