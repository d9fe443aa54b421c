//! Response envelopes for the service's JSON bodies.
//!
//! Row payloads stay as raw [`serde_json::Value`]s here; flattening and
//! model decoding happen in the model layer.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub(crate) struct VersionsResponse {
    #[serde(default)]
    pub(crate) versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionEntry {
    #[serde(default)]
    pub(crate) names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetsResponse {
    #[serde(default)]
    pub(crate) sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetEntry {
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowsResponse {
    #[serde(default)]
    pub(crate) rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub(crate) results: Vec<SearchHit>,
    /// Cursor for the next page; absent or empty means the last page.
    #[serde(default)]
    pub(crate) next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchHit {
    #[serde(default)]
    pub(crate) score: f64,
    /// Missing sheet names never match a requested model, so the hit is
    /// skipped downstream.
    #[serde(default)]
    pub(crate) sheet: String,
    pub(crate) row_id: Option<u32>,
    #[serde(default)]
    pub(crate) fields: Map<String, Value>,
}
