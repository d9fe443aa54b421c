//! Cursor-paginated full-text search streams.

use futures::{stream, Stream};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::wire::SearchPage;
use super::XivClient;
use crate::error::{Result, XivError};
use crate::model::ModelSet;
use crate::query::QueryBuilder;
use crate::transport::Transport;

/// A search query: a prebuilt string, or a builder compiled when the
/// search starts.
#[derive(Debug, Clone)]
pub enum SearchQuery {
    Raw(String),
    Builder(QueryBuilder),
}

impl SearchQuery {
    fn into_query_string(self) -> Result<String> {
        match self {
            SearchQuery::Raw(raw) => Ok(raw),
            SearchQuery::Builder(builder) => builder.build(),
        }
    }
}

impl From<&str> for SearchQuery {
    fn from(raw: &str) -> Self {
        SearchQuery::Raw(raw.to_owned())
    }
}

impl From<String> for SearchQuery {
    fn from(raw: String) -> Self {
        SearchQuery::Raw(raw)
    }
}

impl From<QueryBuilder> for SearchQuery {
    fn from(builder: QueryBuilder) -> Self {
        SearchQuery::Builder(builder)
    }
}

impl From<&QueryBuilder> for SearchQuery {
    fn from(builder: &QueryBuilder) -> Self {
        SearchQuery::Builder(builder.clone())
    }
}

/// Per-call overrides for a search.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Replace the model-derived field specifier list.
    pub fields: Option<Vec<String>>,
    /// Server-side page size hint, sent with the first request.
    pub limit: Option<u32>,
    /// Game version override for this search.
    pub version: Option<String>,
    /// Schema override for this search.
    pub schema: Option<String>,
}

/// One decoded search hit.
#[derive(Debug, Clone)]
pub struct SearchResult<S> {
    /// Relevance score the service assigned.
    pub score: f64,
    /// Sheet the hit came from.
    pub sheet: String,
    pub row_id: u32,
    pub data: S,
}

struct RawHit {
    score: f64,
    sheet: String,
    row_id: u32,
    flat: Map<String, Value>,
}

struct SearchState {
    transport: Transport,
    /// Parameters of the first request; `query` is dropped once a cursor
    /// takes over.
    base_params: Vec<(&'static str, String)>,
    cursor: Option<String>,
    buffer: VecDeque<RawHit>,
    done: bool,
}

impl SearchState {
    fn page_params(&self) -> Vec<(&'static str, String)> {
        match &self.cursor {
            // Continuation requests carry the cursor and must not repeat
            // the query.
            Some(cursor) => {
                let mut params: Vec<_> = self
                    .base_params
                    .iter()
                    .filter(|(key, _)| *key != "query")
                    .cloned()
                    .collect();
                params.push(("cursor", cursor.clone()));
                params
            }
            None => self.base_params.clone(),
        }
    }
}

impl XivClient {
    /// Search the set's sheets, streaming typed hits across page
    /// boundaries.
    ///
    /// The stream is lazy: nothing is requested until it is polled, and
    /// each page is fetched only once the previous one is drained. Hits
    /// from sheets outside the set are skipped; a hit that fails model
    /// validation yields an `Err` item, after which the stream ends.
    pub fn search<S, Q>(
        &self,
        query: Q,
    ) -> Result<impl Stream<Item = Result<SearchResult<S>>> + Send>
    where
        S: ModelSet + Send,
        Q: Into<SearchQuery>,
    {
        self.search_with(query, SearchOptions::default())
    }

    /// [`XivClient::search`] with per-call overrides.
    pub fn search_with<S, Q>(
        &self,
        query: Q,
        options: SearchOptions,
    ) -> Result<impl Stream<Item = Result<SearchResult<S>>> + Send>
    where
        S: ModelSet + Send,
        Q: Into<SearchQuery>,
    {
        let base_params = self.search_params::<S>(query.into(), options)?;
        let state = SearchState {
            transport: self.transport.clone(),
            base_params,
            cursor: None,
            buffer: VecDeque::new(),
            done: false,
        };

        Ok(stream::try_unfold(state, |mut state| async move {
            loop {
                while let Some(hit) = state.buffer.pop_front() {
                    match S::decode_sheet_row(&hit.sheet, hit.flat) {
                        Some(decoded) => {
                            let data = decoded?;
                            let result = SearchResult {
                                score: hit.score,
                                sheet: hit.sheet,
                                row_id: hit.row_id,
                                data,
                            };
                            return Ok(Some((result, state)));
                        }
                        None => debug!("Skipping hit from unrequested sheet {}", hit.sheet),
                    }
                }
                if state.done {
                    return Ok(None);
                }

                let params = state.page_params();
                let page: SearchPage = state.transport.get_json("search", &params).await?;
                debug!("Search page carried {} hits", page.results.len());

                for hit in page.results {
                    let Some(row_id) = hit.row_id else {
                        warn!("Skipping search hit without row_id from sheet {}", hit.sheet);
                        continue;
                    };
                    let mut flat = hit.fields;
                    flat.insert("row_id".to_owned(), Value::from(row_id));
                    state.buffer.push_back(RawHit {
                        score: hit.score,
                        sheet: hit.sheet,
                        row_id,
                        flat,
                    });
                }
                match page.next {
                    Some(next) if !next.is_empty() => state.cursor = Some(next),
                    _ => state.done = true,
                }
            }
        }))
    }

    /// Assemble first-request parameters, validating the model set and
    /// compiling the query before anything goes on the wire.
    fn search_params<S: ModelSet>(
        &self,
        query: SearchQuery,
        options: SearchOptions,
    ) -> Result<Vec<(&'static str, String)>> {
        let sheets = S::sheet_names();
        for (i, name) in sheets.iter().enumerate() {
            if sheets[..i].contains(name) {
                return Err(XivError::InvalidArgument {
                    message: format!("Duplicate sheet {} in search model set", name),
                });
            }
        }

        let query_str = query.into_query_string()?;
        let fields = match options.fields {
            Some(list) => list.join(","),
            None => S::field_specifiers().join(","),
        };

        let mut params: Vec<(&'static str, String)> = vec![
            ("sheets", sheets.join(",")),
            ("query", query_str),
            ("fields", fields),
        ];
        if let Some(limit) = options.limit {
            params.push(("limit", limit.to_string()));
        }
        let version = options
            .version
            .unwrap_or_else(|| self.game_version.clone());
        params.push(("version", version));
        if let Some(schema) = options.schema.or_else(|| self.schema_version.clone()) {
            params.push(("schema", schema));
        }
        Ok(params)
    }
}
