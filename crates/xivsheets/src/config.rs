//! Centralized configuration for the xivsheets client.
//!
//! Default endpoint, versioning, and transport parameters live here; the
//! client builder overrides any of them per instance.

use std::time::Duration;

/// Upstream service endpoints and data defaults.
pub struct ApiConfig;

impl ApiConfig {
    pub const BASE_URL: &'static str = "https://v2.xivapi.com";
    pub const API_PATH: &'static str = "/api";
    /// Game version sent when the caller never picked one.
    pub const DEFAULT_GAME_VERSION: &'static str = "latest";
    /// Row ids per multi-row request.
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    pub const USER_AGENT: &'static str = concat!("xivsheets/", env!("CARGO_PKG_VERSION"));
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
}
