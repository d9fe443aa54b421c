//! xivsheets - Typed async client for the XIVAPI v2 game-data search
//! service.
//!
//! Callers declare result shapes as [`Model`] types with static field
//! descriptor tables, compose filters with [`QueryBuilder`], and consume
//! rows and search hits as lazy streams. Pagination cursors, row batching,
//! field specifier expansion, and response reshaping all happen behind the
//! [`XivClient`] surface.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use serde::Deserialize;
//! use xivsheets::{FieldDescriptor, Model, QueryBuilder, XivClient};
//!
//! #[derive(Debug, Deserialize)]
//! struct Item {
//!     row_id: u32,
//!     name: String,
//! }
//!
//! impl Model for Item {
//!     const SHEET: &'static str = "Item";
//!     const FIELDS: &'static [FieldDescriptor] = &[
//!         FieldDescriptor::aliased("row_id", "row_id"),
//!         FieldDescriptor::new("name"),
//!     ];
//! }
//!
//! #[tokio::main]
//! async fn main() -> xivsheets::Result<()> {
//!     let client = XivClient::new()?;
//!     let query = QueryBuilder::new().contains("Name", "sword");
//!     let mut hits = client.search::<Item, _>(query)?;
//!     while let Some(hit) = hits.try_next().await? {
//!         println!("{} (score {})", hit.data.name, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod retry;

mod transport;

// Re-export commonly used types
pub use client::{
    AssetFormat, RowSource, RowStream, SearchOptions, SearchQuery, SearchResult, XivClient,
    XivClientBuilder,
};
pub use error::{Result, XivError};
pub use model::{
    Either2, Either3, FieldDescriptor, FieldMapping, Language, LocalizedText, Model, ModelSet,
};
pub use query::{Operator, QueryBuilder, QueryValue};
pub use retry::RetryConfig;
