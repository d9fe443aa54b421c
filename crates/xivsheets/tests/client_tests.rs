//! Integration tests driving [`XivClient`] against an in-process mock of
//! the upstream service.
//!
//! Each test spins an axum server on an ephemeral port, points a client at
//! it, and asserts the wire protocol: which parameters each request
//! carries, how pagination continues, how batches split, and how 404/500
//! answers surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use xivsheets::{AssetFormat, FieldDescriptor, Model, QueryBuilder, XivClient, XivError};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    row_id: u32,
    name: String,
}

impl Model for Item {
    const SHEET: &'static str = "Item";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::aliased("row_id", "row_id"),
        FieldDescriptor::new("name"),
    ];
}

/// Query parameters of every request the mock served, arrival order.
#[derive(Clone, Default)]
struct RequestLog(Arc<Mutex<Vec<HashMap<String, String>>>>);

impl RequestLog {
    fn record(&self, params: &HashMap<String, String>) {
        self.0.lock().unwrap().push(params.clone());
    }

    fn requests(&self) -> Vec<HashMap<String, String>> {
        self.0.lock().unwrap().clone()
    }
}

/// Serve `router` on an ephemeral port, returning the base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> XivClient {
    XivClient::builder()
        .base_url(base_url)
        .game_version("7.05")
        .build()
        .unwrap()
}

// ============================================================================
// Search pagination
// ============================================================================

async fn two_page_search(
    State(log): State<RequestLog>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    log.record(&params);
    if params.contains_key("cursor") {
        assert_eq!(params.get("cursor").map(String::as_str), Some("cursor-1"));
        Json(json!({
            "results": [
                {"score": 0.7, "sheet": "Item", "row_id": 3, "fields": {"Name": "Gamma"}},
            ],
            "next": null,
        }))
    } else {
        Json(json!({
            "results": [
                {"score": 1.0, "sheet": "Item", "row_id": 1, "fields": {"Name": "Alpha"}},
                {"score": 0.9, "sheet": "Item", "row_id": 2, "fields": {"Name": "Beta"}},
                {"score": 0.8, "sheet": "Unrequested", "row_id": 9, "fields": {}},
                {"score": 0.8, "sheet": "Item", "fields": {"Name": "NoRowId"}},
            ],
            "next": "cursor-1",
        }))
    }
}

#[tokio::test]
async fn test_search_paginates_with_cursor_and_skips_foreign_sheets() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/search", get(two_page_search))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    let query = QueryBuilder::new().contains("Name", "a");
    let hits: Vec<_> = client
        .search::<Item, _>(query)
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    // Foreign-sheet and row_id-less hits are skipped, page order kept
    let names: Vec<&str> = hits.iter().map(|h| h.data.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(hits[0].row_id, 1);
    assert_eq!(hits[0].sheet, "Item");
    assert!((hits[0].score - 1.0).abs() < f64::EPSILON);

    // Exactly one request carried the query; the continuation swapped it
    // for the cursor and kept the version
    let requests = log.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].get("query").map(String::as_str),
        Some(r#"Name~"a""#)
    );
    assert!(!requests[0].contains_key("cursor"));
    assert_eq!(requests[0].get("sheets").map(String::as_str), Some("Item"));
    assert_eq!(
        requests[0].get("fields").map(String::as_str),
        Some("row_id,Name")
    );

    assert!(!requests[1].contains_key("query"));
    assert_eq!(
        requests[1].get("cursor").map(String::as_str),
        Some("cursor-1")
    );
    assert_eq!(requests[1].get("version").map(String::as_str), Some("7.05"));
}

#[tokio::test]
async fn test_search_stream_is_lazy_and_restartable() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/search", get(two_page_search))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    // Building the stream issues nothing
    let stream = client.search::<Item, _>(r#"Name~"a""#).unwrap();
    assert!(log.requests().is_empty());

    // Draining only the first page never requests the second
    let first_page: Vec<_> = stream.take(2).try_collect().await.unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(log.requests().len(), 1);

    // A fresh invocation restarts from the beginning
    let all: Vec<_> = client
        .search::<Item, _>(r#"Name~"a""#)
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(log.requests().len(), 3);
    assert!(log.requests()[1].contains_key("query"));
}

#[tokio::test]
async fn test_search_500_is_a_transport_family_error() {
    let router = Router::new().route(
        "/api/search",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
    );
    let base = spawn(router).await;
    let client = client_for(&base);

    let mut stream = std::pin::pin!(client.search::<Item, _>(r#"Name~"a""#).unwrap());
    let err = stream.try_next().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    match err {
        XivError::Http { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Http error, got {other}"),
    }
}

// ============================================================================
// Row fetch
// ============================================================================

async fn single_row(Path(row_id): Path<u32>) -> Result<Json<Value>, StatusCode> {
    if row_id == 123 {
        Ok(Json(json!({
            "row_id": 123,
            "fields": {"Name": "Iron Sword"},
        })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

#[tokio::test]
async fn test_single_row_and_not_found() {
    let router = Router::new().route("/api/sheet/Item/:row_id", get(single_row));
    let base = spawn(router).await;
    let client = client_for(&base);

    let item = client.row::<Item>(123).await.unwrap().unwrap();
    assert_eq!(
        item,
        Item {
            row_id: 123,
            name: "Iron Sword".into(),
        }
    );

    // Absence is a None, not an error
    assert_eq!(client.row::<Item>(999).await.unwrap(), None);
}

async fn batched_rows(
    State(log): State<RequestLog>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    log.record(&params);
    let rows: Vec<Value> = params["rows"]
        .split(',')
        .map(|id| {
            let id: u32 = id.parse().unwrap();
            json!({"row_id": id, "fields": {"Name": format!("Row {}", id)}})
        })
        .collect();
    Json(json!({"rows": rows}))
}

#[tokio::test]
async fn test_batched_fetch_splits_250_ids_into_3_requests() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/sheet/Item", get(batched_rows))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    let items: Vec<Item> = client.rows(0..250u32).try_collect().await.unwrap();
    assert_eq!(items.len(), 250);
    assert_eq!(items[0].row_id, 0);
    assert_eq!(items[249].row_id, 249);
    assert_eq!(items[107].name, "Row 107");

    let requests = log.requests();
    assert_eq!(requests.len(), 3);
    let batch_sizes: Vec<usize> = requests
        .iter()
        .map(|r| r["rows"].split(',').count())
        .collect();
    assert_eq!(batch_sizes, vec![100, 100, 50]);
    assert_eq!(requests[0].get("version").map(String::as_str), Some("7.05"));
    assert_eq!(
        requests[0].get("fields").map(String::as_str),
        Some("row_id,Name")
    );
    assert!(requests[2]["rows"].starts_with("200,"));
}

#[tokio::test]
async fn test_batched_fetch_skips_rows_without_row_id() {
    let router = Router::new().route(
        "/api/sheet/Item",
        get(|| async {
            Json(json!({
                "rows": [
                    {"row_id": 1, "fields": {"Name": "One"}},
                    {"fields": {"Name": "Malformed"}},
                    {"row_id": 3, "fields": {"Name": "Three"}},
                ],
            }))
        }),
    );
    let base = spawn(router).await;
    let client = client_for(&base);

    let items: Vec<Item> = client.rows(vec![1, 2, 3]).try_collect().await.unwrap();
    let ids: Vec<u32> = items.iter().map(|i| i.row_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_batched_fetch_500_fails_the_batch() {
    let router = Router::new().route(
        "/api/sheet/Item",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn(router).await;
    let client = client_for(&base);

    let mut stream = std::pin::pin!(client.rows::<Item, _>(vec![1, 2, 3]));
    let err = stream.try_next().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_concurrent_batched_fetch_keeps_batch_order() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/sheet/Item", get(batched_rows))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = XivClient::builder()
        .base_url(base.as_str())
        .batch_size(10)
        .build()
        .unwrap();

    let items: Vec<Item> = client
        .rows_concurrent(0..35u32, 4)
        .try_collect()
        .await
        .unwrap();
    let ids: Vec<u32> = items.iter().map(|i| i.row_id).collect();
    assert_eq!(ids, (0..35).collect::<Vec<_>>());
    assert_eq!(log.requests().len(), 4);
}

// ============================================================================
// Assets
// ============================================================================

async fn asset_endpoint(
    State(log): State<RequestLog>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Vec<u8>, StatusCode> {
    log.record(&params);
    if params["path"] == "ui/missing.tex" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(b"\x89PNG fake image bytes".to_vec())
}

#[tokio::test]
async fn test_asset_fetch_and_absent() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/asset", get(asset_endpoint))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    let bytes = client
        .asset("ui/loadingimage/-nowloading_base25_hr1.tex", AssetFormat::Png, None)
        .await
        .unwrap()
        .unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));

    let absent = client
        .asset("ui/missing.tex", AssetFormat::Jpg, None)
        .await
        .unwrap();
    assert_eq!(absent, None);

    let requests = log.requests();
    assert_eq!(requests[0].get("format").map(String::as_str), Some("png"));
    assert_eq!(requests[1].get("format").map(String::as_str), Some("jpg"));
    assert_eq!(requests[0].get("version").map(String::as_str), Some("7.05"));
}

#[tokio::test]
async fn test_icon_builds_bucketed_asset_path() {
    let log = RequestLog::default();
    let router = Router::new()
        .route("/api/asset", get(asset_endpoint))
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    let bytes = client.icon(14002, AssetFormat::Webp, None).await.unwrap();
    assert!(bytes.is_some());

    let requests = log.requests();
    assert_eq!(
        requests[0].get("path").map(String::as_str),
        Some("ui/icon/014000/014002_hr1.tex")
    );
    assert_eq!(requests[0].get("format").map(String::as_str), Some("webp"));
}

#[tokio::test]
async fn test_map_fetch_and_absent() {
    let router = Router::new().route(
        "/api/asset/map/:territory/:index",
        get(
            |Path((territory, index)): Path<(String, String)>| async move {
                if territory == "s1d1" && index == "00" {
                    Ok(b"map bytes".to_vec())
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            },
        ),
    );
    let base = spawn(router).await;
    let client = client_for(&base);

    let bytes = client.map("s1d1", "00", None).await.unwrap().unwrap();
    assert_eq!(&bytes[..], b"map bytes");

    assert_eq!(client.map("w1t2", "03", None).await.unwrap(), None);
}

// ============================================================================
// Listings
// ============================================================================

#[tokio::test]
async fn test_versions_and_sheets_listings() {
    let log = RequestLog::default();
    let router = Router::new()
        .route(
            "/api/version",
            get(|| async {
                Json(json!({
                    "versions": [
                        {"names": ["7.05", "7.05x1"]},
                        {"names": ["latest"]},
                    ],
                }))
            }),
        )
        .route(
            "/api/sheet",
            get(
                |State(log): State<RequestLog>, Query(params): Query<HashMap<String, String>>| async move {
                    log.record(&params);
                    Json(json!({"sheets": [{"name": "Item"}, {"name": "Action"}, {}]}))
                },
            ),
        )
        .with_state(log.clone());
    let base = spawn(router).await;
    let client = client_for(&base);

    let versions = client.versions().await.unwrap();
    assert_eq!(versions, vec!["7.05", "7.05x1", "latest"]);

    let sheets = client.sheets(Some("6.58")).await.unwrap();
    assert_eq!(sheets, vec!["Item", "Action"]);
    assert_eq!(
        log.requests()[0].get("version").map(String::as_str),
        Some("6.58")
    );
}
