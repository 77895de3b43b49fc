use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{Value, json};
use sheetsync_client::{
    CacheEffect, LocalCache, RecordSynchronizer, RemoteError, RemoteStore, SheetDbStore, UpdateMode, Via,
};
use sheetsync_core::RecordId;
use sheetsync_reports::{InstallationItem, InstallationReport, ServiceReport, SparePart};

#[derive(Default)]
struct Sheet {
    rows: Vec<Value>,
    failing: bool,
    rejecting: bool,
    last_auth: Option<String>,
    last_update_method: Option<Method>,
}

type Shared = Arc<Mutex<Sheet>>;

/// Spreadsheet API double bound to an ephemeral port.
struct MockSheet {
    base_url: Url,
    state: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl MockSheet {
    async fn spawn() -> Self {
        Self::spawn_with(Vec::new()).await
    }

    async fn spawn_with(rows: Vec<Value>) -> Self {
        let state: Shared = Arc::new(Mutex::new(Sheet {
            rows,
            ..Sheet::default()
        }));

        let app = Router::new()
            .route("/api/v1/sheet", get(list_rows).post(create_row))
            .route("/api/v1/sheet/search", get(search_rows))
            .route("/api/v1/sheet/id/:id", put(update_row).patch(update_row).delete(delete_row))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = Url::parse(&format!("http://{addr}/api/v1/sheet")).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    fn store(&self, mode: UpdateMode) -> SheetDbStore {
        SheetDbStore::new(self.base_url.clone(), mode, Duration::from_secs(5)).unwrap()
    }

    fn sheet(&self) -> std::sync::MutexGuard<'_, Sheet> {
        self.state.lock().unwrap()
    }
}

impl Drop for MockSheet {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn observe(sheet: &mut Sheet, headers: &HeaderMap) -> Option<Response> {
    sheet.last_auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    sheet
        .failing
        .then(|| (StatusCode::INTERNAL_SERVER_ERROR, "sheet backend unavailable").into_response())
}

async fn list_rows(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut sheet = state.lock().unwrap();
    if let Some(failure) = observe(&mut sheet, &headers) {
        return failure;
    }
    Json(sheet.rows.clone()).into_response()
}

async fn search_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut sheet = state.lock().unwrap();
    if let Some(failure) = observe(&mut sheet, &headers) {
        return failure;
    }
    let id = params.get("id").cloned().unwrap_or_default();
    let rows: Vec<Value> = sheet.rows.iter().filter(|r| r["id"] == id).cloned().collect();
    Json(rows).into_response()
}

async fn create_row(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut sheet = state.lock().unwrap();
    if let Some(failure) = observe(&mut sheet, &headers) {
        return failure;
    }
    if sheet.rejecting {
        return Json(json!({ "created": 0 })).into_response();
    }
    sheet.rows.push(body["data"].clone());
    Json(json!({ "created": 1 })).into_response()
}

async fn update_row(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut sheet = state.lock().unwrap();
    if let Some(failure) = observe(&mut sheet, &headers) {
        return failure;
    }
    sheet.last_update_method = Some(method.clone());

    let mut updated = 0;
    for row in sheet.rows.iter_mut().filter(|r| r["id"] == id) {
        match (row.as_object_mut(), body["data"].as_object()) {
            (Some(row), Some(data)) if method == Method::PATCH => {
                for (k, v) in data {
                    row.insert(k.clone(), v.clone());
                }
            }
            _ => *row = body["data"].clone(),
        }
        updated += 1;
    }
    Json(json!({ "updated": updated })).into_response()
}

async fn delete_row(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let mut sheet = state.lock().unwrap();
    if let Some(failure) = observe(&mut sheet, &headers) {
        return failure;
    }
    let before = sheet.rows.len();
    sheet.rows.retain(|r| r["id"] != id);
    let deleted = before - sheet.rows.len();
    Json(json!({ "deleted": deleted })).into_response()
}

fn pump_install(id: &str) -> InstallationReport {
    let mut report = InstallationReport::with_id(RecordId::from(id), "Acme");
    report.invoice_no = Some("INV-9".to_string());
    report.items.push(InstallationItem::new("Pump", 2));
    report
}

#[tokio::test]
async fn installation_lifecycle_over_http() {
    let srv = MockSheet::spawn().await;
    let store = srv.store(UpdateMode::Put).with_token("t0ken");

    store.create(&pump_install("A")).await.unwrap();
    {
        let sheet = srv.sheet();
        assert_eq!(sheet.last_auth.as_deref(), Some("Bearer t0ken"));
        // Nested items travel as an embedded JSON string cell.
        assert!(sheet.rows[0]["items"].is_string());
    }

    let listed: Vec<InstallationReport> = store.list().await.unwrap();
    assert_eq!(listed, vec![pump_install("A")]);

    let found: Vec<InstallationReport> = store.search_by_id(&RecordId::from("A")).await.unwrap();
    assert_eq!(found.len(), 1);

    let mut revised = pump_install("A");
    revised.customer_name = "Acme Ltd".to_string();
    store.update(&RecordId::from("A"), &revised).await.unwrap();
    assert_eq!(srv.sheet().last_update_method, Some(Method::PUT));

    let listed: Vec<InstallationReport> = store.list().await.unwrap();
    assert_eq!(listed[0].customer_name, "Acme Ltd");

    RemoteStore::<InstallationReport>::delete(&store, &RecordId::from("A")).await.unwrap();
    assert!(srv.sheet().rows.is_empty());
}

#[tokio::test]
async fn zero_counts_map_to_typed_errors() {
    let srv = MockSheet::spawn().await;
    let store = srv.store(UpdateMode::Put);
    let ghost = RecordId::from("ghost");

    assert_eq!(
        store.update(&ghost, &pump_install("ghost")).await,
        Err(RemoteError::NotFound(ghost.clone()))
    );
    assert_eq!(
        RemoteStore::<InstallationReport>::delete(&store, &ghost).await,
        Err(RemoteError::NotFound(ghost))
    );

    srv.sheet().rejecting = true;
    assert!(matches!(
        store.create(&pump_install("A")).await,
        Err(RemoteError::Rejected(_))
    ));
}

#[tokio::test]
async fn service_updates_use_patch_and_legacy_rows_decode() {
    let legacy = json!({
        "id": "S1",
        "csrNo": "012",
        "customerName": "Globex",
        "closedDate": "",
        "spareNames": "Filter, Valve",
        "spareQuantities": "2, 1",
        "spareCosts": "150, N/A"
    });
    let srv = MockSheet::spawn_with(vec![legacy]).await;
    let store = srv.store(UpdateMode::Patch);

    let listed: Vec<ServiceReport> = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0].spares,
        vec![
            SparePart::new("Filter", Some(2), Some(150.0)),
            SparePart::new("Valve", Some(1), None),
        ]
    );

    let mut closed = listed[0].clone();
    closed.closed_date = Some("2024-05-02".to_string());
    store.update(&RecordId::from("S1"), &closed).await.unwrap();

    let sheet = srv.sheet();
    assert_eq!(sheet.last_update_method, Some(Method::PATCH));
    assert_eq!(sheet.rows[0]["closedDate"], "2024-05-02");
    assert!(sheet.rows[0]["spares"].is_string());
}

#[tokio::test]
async fn malformed_rows_are_skipped() {
    let srv = MockSheet::spawn_with(vec![
        json!({ "id": "A", "customerName": "Acme" }),
        json!({ "id": 17, "customerName": "Broken" }),
    ])
    .await;
    let store = srv.store(UpdateMode::Put);

    let listed: Vec<InstallationReport> = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].customer_name, "Acme");
}

#[tokio::test]
async fn server_errors_and_dead_ports_are_unreachable() {
    let srv = MockSheet::spawn().await;
    srv.sheet().failing = true;
    let err = RemoteStore::<InstallationReport>::list(&srv.store(UpdateMode::Put))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 500, .. }));
    assert!(err.is_unreachable());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dead = SheetDbStore::new(
        Url::parse(&format!("http://{addr}/api/v1/sheet")).unwrap(),
        UpdateMode::Put,
        Duration::from_secs(2),
    )
    .unwrap();
    let err = RemoteStore::<InstallationReport>::list(&dead).await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}

#[tokio::test]
async fn synchronizer_falls_back_when_the_sheet_goes_down() {
    let srv = MockSheet::spawn().await;
    let cache = LocalCache::in_memory().await.unwrap();
    let sync = RecordSynchronizer::new(srv.store(UpdateMode::Put), cache);

    let outcome = sync.create(pump_install("A")).await.unwrap();
    assert_eq!(outcome.via, Via::Remote);

    srv.sheet().failing = true;

    let outcome = sync.create(pump_install("B")).await.unwrap();
    assert_eq!(outcome.via, Via::Local);
    assert!(outcome.degraded);
    assert_eq!(outcome.cache, CacheEffect::Inserted);

    let listing = sync.list(Some("inv-9")).await;
    assert!(listing.degraded);
    assert_eq!(listing.records.len(), 2);
    assert_eq!(listing.stats.total_line_items, 4);
    assert_eq!(listing.stats.distinct_customers, 1);

    srv.sheet().failing = false;
    let listing = sync.list(None).await;
    assert_eq!(listing.via, Via::Remote);
    // The remote copy wins wholesale; the unsynchronized record is dropped.
    assert_eq!(listing.records, vec![pump_install("A")]);
}
