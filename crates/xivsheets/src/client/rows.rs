//! Single-row lookup and the batched multi-row fetch engine.

use futures::future;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::ops::{Range, RangeInclusive};
use tracing::{debug, warn};

use super::wire::RowsResponse;
use super::XivClient;
use crate::error::Result;
use crate::model::{self, Model};
use crate::transport::Transport;

/// A producer of row ids for a multi-row fetch.
///
/// Ready collections ([`Vec`], slices, arrays, ranges) implement this
/// directly; live async sources go through the [`RowStream`] adapter.
/// Arbitrary iterators can be bridged with
/// `RowStream(futures::stream::iter(ids))`.
pub trait RowSource {
    fn into_row_stream(self) -> BoxStream<'static, u32>;
}

impl RowSource for Vec<u32> {
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        stream::iter(self).boxed()
    }
}

impl RowSource for &[u32] {
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        stream::iter(self.to_vec()).boxed()
    }
}

impl<const N: usize> RowSource for [u32; N] {
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        stream::iter(self).boxed()
    }
}

impl RowSource for Range<u32> {
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        stream::iter(self).boxed()
    }
}

impl RowSource for RangeInclusive<u32> {
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        stream::iter(self).boxed()
    }
}

/// Adapter feeding a live id stream into a multi-row fetch.
pub struct RowStream<S>(pub S);

impl<S> RowSource for RowStream<S>
where
    S: Stream<Item = u32> + Send + 'static,
{
    fn into_row_stream(self) -> BoxStream<'static, u32> {
        self.0.boxed()
    }
}

struct FetchState<M> {
    transport: Transport,
    path: String,
    params: Vec<(&'static str, String)>,
    batches: stream::Chunks<BoxStream<'static, u32>>,
    buffer: VecDeque<M>,
}

impl XivClient {
    /// Fetch a single row as a typed model.
    ///
    /// `Ok(None)` covers both a 404 answer and an envelope the service
    /// returned without a `row_id`.
    pub async fn row<M: Model>(&self, row_id: u32) -> Result<Option<M>> {
        let params = self.model_params::<M>();
        let path = format!("sheet/{}/{}", M::SHEET, row_id);
        let Some(envelope) = self.transport.get_json_opt::<Value>(&path, &params).await? else {
            return Ok(None);
        };
        let Some(flat) = model::flatten_row(envelope) else {
            debug!("Row {}/{} has no row_id, treating as absent", M::SHEET, row_id);
            return Ok(None);
        };
        model::decode_row(flat).map(Some)
    }

    /// Fetch many rows lazily, one request per batch of ids.
    ///
    /// Ids are chunked into batches of the configured `batch_size`.
    /// Batches arrive in id order; within a batch, rows keep the order the
    /// service answered with, which is not guaranteed to match the request.
    /// Rows the service omitted, or sent without a `row_id`, are skipped.
    /// The stream ends after the first error it yields.
    pub fn rows<M, R>(&self, source: R) -> impl Stream<Item = Result<M>> + Send
    where
        M: Model + Send,
        R: RowSource,
    {
        let state = FetchState::<M> {
            transport: self.transport.clone(),
            path: format!("sheet/{}", M::SHEET),
            params: self.model_params::<M>(),
            batches: source.into_row_stream().chunks(self.batch_size),
            buffer: VecDeque::new(),
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Ok(Some((item, state)));
                }
                match state.batches.next().await {
                    Some(batch) => {
                        let items =
                            fetch_batch::<M>(&state.transport, &state.path, &state.params, &batch)
                                .await?;
                        state.buffer.extend(items);
                    }
                    None => return Ok(None),
                }
            }
        })
    }

    /// Like [`XivClient::rows`], but keeps up to `concurrency` batch
    /// requests in flight.
    ///
    /// Results still come out in batch order. A failed batch yields one
    /// `Err` item and the remaining batches are still delivered.
    pub fn rows_concurrent<M, R>(
        &self,
        source: R,
        concurrency: usize,
    ) -> impl Stream<Item = Result<M>> + Send
    where
        M: Model + Send + 'static,
        R: RowSource,
    {
        let transport = self.transport.clone();
        let path = format!("sheet/{}", M::SHEET);
        let params = self.model_params::<M>();
        let concurrency = concurrency.max(1);

        source
            .into_row_stream()
            .chunks(self.batch_size)
            .map(move |batch| {
                let transport = transport.clone();
                let path = path.clone();
                let params = params.clone();
                async move { fetch_batch::<M>(&transport, &path, &params, &batch).await }
            })
            .buffered(concurrency)
            .flat_map(|outcome| match outcome {
                Ok(items) => stream::iter(items.into_iter().map(Ok)).left_stream(),
                Err(e) => stream::once(future::ready(Err(e))).right_stream(),
            })
    }

    /// Version, schema, and field specifier parameters for a model fetch.
    fn model_params<M: Model>(&self) -> Vec<(&'static str, String)> {
        let mut params = self.version_params(None);
        params.push(("fields", model::field_specifiers::<M>().join(",")));
        params
    }
}

/// Fetch and decode one batch of rows.
async fn fetch_batch<M: Model>(
    transport: &Transport,
    path: &str,
    params: &[(&'static str, String)],
    batch: &[u32],
) -> Result<Vec<M>> {
    let rows_param = batch
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut query = params.to_vec();
    query.push(("rows", rows_param));

    let data: RowsResponse = transport.get_json(path, &query).await?;
    debug!("Fetched {} of {} requested rows from {}", data.rows.len(), batch.len(), path);

    let mut items = Vec::with_capacity(data.rows.len());
    for envelope in data.rows {
        match model::flatten_row(envelope) {
            Some(flat) => items.push(model::decode_row::<M>(flat)?),
            None => warn!("Skipping row without row_id from {}", path),
        }
    }
    Ok(items)
}
