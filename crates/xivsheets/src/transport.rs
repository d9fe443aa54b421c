//! HTTP transport shared by every endpoint.
//!
//! One reqwest client, one place that builds request URLs, retries
//! transport failures, and classifies responses. Endpoint code above this
//! layer never touches reqwest directly.

use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, XivError};
use crate::retry::{retry, RetryConfig};

/// Shared HTTP layer under the client.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    /// Base URL joined with the API path, no trailing slash.
    api_root: String,
    retry: RetryConfig,
}

impl Transport {
    pub(crate) fn new(
        base_url: &str,
        api_path: &str,
        user_agent: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        let api_root = format!("{}{}", base_url.trim_end_matches('/'), api_path);
        Ok(Self {
            client,
            api_root,
            retry,
        })
    }

    /// Full URL for an endpoint path like `sheet/Item/123`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path)
    }

    /// GET a JSON document. Any non-2xx status is an error.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.get_response(&url, query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &url, response).await);
        }
        decode_json(&url, response).await
    }

    /// GET a JSON document where 404 is the absent signal.
    pub(crate) async fn get_json_opt<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = self.endpoint(path);
        let response = self.get_response(&url, query).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GET {} answered 404, treating as absent", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, &url, response).await);
        }
        decode_json(&url, response).await.map(Some)
    }

    /// GET a binary body where 404 is the absent signal.
    pub(crate) async fn get_bytes_opt(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Bytes>> {
        let url = self.endpoint(path);
        let response = self.get_response(&url, query).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GET {} answered 404, treating as absent", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, &url, response).await);
        }
        let bytes = response.bytes().await?;
        Ok(Some(bytes))
    }

    /// Send a GET with transport-level retries. Served statuses, happy or
    /// not, come back as responses for the caller to classify.
    async fn get_response(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        retry(
            &self.retry,
            || async {
                debug!("GET {}", url);
                let response = self.client.get(url).query(query).send().await?;
                Ok::<_, XivError>(response)
            },
            XivError::is_retryable,
        )
        .await
    }
}

async fn status_error(status: StatusCode, url: &str, response: Response) -> XivError {
    let body = response.text().await.unwrap_or_default();
    XivError::Http {
        status: status.as_u16(),
        url: url.to_owned(),
        body,
    }
}

async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| XivError::Json {
        url: url.to_owned(),
        source,
    })
}
