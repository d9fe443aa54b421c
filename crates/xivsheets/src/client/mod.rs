//! Typed client for the game-data search service.
//!
//! One [`XivClient`] covers the whole surface:
//! - Version and sheet listing
//! - Single-row lookup and batched multi-row fetch
//! - Cursor-paginated full-text search as lazy streams
//! - Binary asset, map, and icon retrieval
//!
//! # Module Organization
//!
//! - `assets` - Binary asset, map composition, and icon paths
//! - `rows` - Row lookup and the batched fetch engine
//! - `search` - Cursor-paginated search streams
//! - `wire` - Response envelope structs

mod assets;
mod rows;
mod search;
mod wire;

pub use assets::AssetFormat;
pub use rows::{RowSource, RowStream};
pub use search::{SearchOptions, SearchQuery, SearchResult};

use std::time::Duration;

use crate::config::{ApiConfig, NetworkConfig};
use crate::error::{Result, XivError};
use crate::retry::RetryConfig;
use crate::transport::Transport;
use wire::{SheetsResponse, VersionsResponse};

/// Client for the versioned game-data search service.
///
/// Cheap to clone; all clones share one HTTP connection pool. Apart from
/// [`XivClient::patch`] the client is immutable after build.
///
/// # Example
///
/// ```rust,ignore
/// use xivsheets::XivClient;
///
/// let client = XivClient::builder()
///     .game_version("7.05")
///     .build()?;
/// let versions = client.versions().await?;
/// ```
#[derive(Debug, Clone)]
pub struct XivClient {
    pub(super) transport: Transport,
    /// Game version injected into every data request unless overridden.
    pub(super) game_version: String,
    /// Schema version injected when configured.
    pub(super) schema_version: Option<String>,
    /// Row ids per multi-row request.
    pub(super) batch_size: usize,
}

impl XivClient {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> XivClientBuilder {
        XivClientBuilder::new()
    }

    /// Game version requests currently carry.
    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    /// Switch every subsequent request to another game version.
    pub fn patch(&mut self, version: impl Into<String>) {
        self.game_version = version.into();
    }

    /// List every game version name the service knows, flattened.
    pub async fn versions(&self) -> Result<Vec<String>> {
        let data: VersionsResponse = self.transport.get_json("version", &[]).await?;
        Ok(data
            .versions
            .into_iter()
            .flat_map(|entry| entry.names)
            .collect())
    }

    /// List sheet names, optionally for a specific game version.
    pub async fn sheets(&self, version: Option<&str>) -> Result<Vec<String>> {
        let params = self.version_params(version);
        let data: SheetsResponse = self.transport.get_json("sheet", &params).await?;
        Ok(data
            .sheets
            .into_iter()
            .filter_map(|entry| entry.name)
            .collect())
    }

    /// Version and schema parameters for a data request. A per-call
    /// version wins over the configured one; schema rides along only when
    /// configured.
    pub(super) fn version_params(&self, version: Option<&str>) -> Vec<(&'static str, String)> {
        let version = version.unwrap_or(&self.game_version).to_owned();
        let mut params = vec![("version", version)];
        if let Some(schema) = &self.schema_version {
            params.push(("schema", schema.clone()));
        }
        params
    }
}

/// Builder for configuring [`XivClient`] construction.
#[derive(Debug, Clone)]
pub struct XivClientBuilder {
    base_url: String,
    api_path: String,
    game_version: String,
    schema_version: Option<String>,
    batch_size: usize,
    timeout: Duration,
    user_agent: String,
    retry: RetryConfig,
}

impl Default for XivClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XivClientBuilder {
    /// Create a new builder seeded with the configured defaults.
    pub fn new() -> Self {
        Self {
            base_url: ApiConfig::BASE_URL.to_owned(),
            api_path: ApiConfig::API_PATH.to_owned(),
            game_version: ApiConfig::DEFAULT_GAME_VERSION.to_owned(),
            schema_version: None,
            batch_size: ApiConfig::DEFAULT_BATCH_SIZE,
            timeout: NetworkConfig::REQUEST_TIMEOUT,
            user_agent: ApiConfig::USER_AGENT.to_owned(),
            retry: RetryConfig::default(),
        }
    }

    /// Point the client at another service instance.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Path prefix under the base URL, `/api` by default.
    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    /// Game version injected into data requests. Default: `latest`.
    pub fn game_version(mut self, version: impl Into<String>) -> Self {
        self.game_version = version.into();
        self
    }

    /// Schema version injected into data requests. Default: none.
    pub fn schema_version(mut self, schema: impl Into<String>) -> Self {
        self.schema_version = Some(schema.into());
        self
    }

    /// Row ids per multi-row request. Default: 100.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Total request timeout. Default: 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// User agent sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Retry behavior for transport failures.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<XivClient> {
        if self.batch_size == 0 {
            return Err(XivError::InvalidArgument {
                message: "batch_size must be at least 1".into(),
            });
        }
        let transport = Transport::new(
            &self.base_url,
            &self.api_path,
            &self.user_agent,
            self.timeout,
            self.retry,
        )?;
        Ok(XivClient {
            transport,
            game_version: self.game_version,
            schema_version: self.schema_version,
            batch_size: self.batch_size,
        })
    }
}
