use anyhow::Result;
use std::path::PathBuf;

// ============================================================================
// Configuration Constants
// ============================================================================

// Default interval between diagnostics samples (in seconds)
const DEFAULT_DIAGNOSTICS_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Configuration Structure
// ============================================================================

/// Node configuration consumed by [`crate::Component`].
///
/// All fields are read once at construction time; the core performs no
/// ambient configuration lookups afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Unique component id announced to the discovery registry
    pub component_id: String,
    /// Bearer token attached to outgoing calls
    pub component_token: String,
    /// Human-readable description of this instance
    pub description: String,
    /// Discovery registry address (e.g. "http://discovery:1900")
    pub discovery_server: String,
    /// Authorization server base address; the token key is fetched from
    /// "{auth_server}/key"
    pub auth_server: String,
    /// Optional on-disk cache file for the token key (offline operation)
    pub key_cache_path: Option<PathBuf>,
    /// Interval between diagnostics samples
    pub diagnostics_interval_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            component_id: std::env::var("COMPONENT_ID").unwrap_or_default(),
            component_token: std::env::var("COMPONENT_TOKEN").unwrap_or_default(),
            description: std::env::var("COMPONENT_DESCRIPTION").unwrap_or_default(),
            discovery_server: std::env::var("DISCOVERY_SERVER").unwrap_or_default(),
            auth_server: std::env::var("AUTH_SERVER").unwrap_or_default(),
            key_cache_path: std::env::var("TOKEN_KEY_CACHE").ok().map(PathBuf::from),
            diagnostics_interval_secs: std::env::var("DIAGNOSTICS_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIAGNOSTICS_INTERVAL_SECS),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            component_id: String::new(),
            component_token: String::new(),
            description: String::new(),
            discovery_server: String::new(),
            auth_server: String::new(),
            key_cache_path: None,
            diagnostics_interval_secs: DEFAULT_DIAGNOSTICS_INTERVAL_SECS,
            rust_log: "info".to_string(),
        }
    }
}
