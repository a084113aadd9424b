use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use worksheets::backend::{Backend, RemoteBackend, RemoteOptions};
use worksheets::{
    CatalogClient, ErrorKind, FilePayload, SortField, SortSpec, Submission, WorksheetDraft,
    WorksheetPatch,
};

const KEY: &str = "service-role-key";

#[derive(Default)]
struct Mock {
    rows: Mutex<Vec<Value>>,
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    next_id: AtomicI64,
    requests: AtomicUsize,
    last_order: Mutex<Option<String>>,
    last_patch: Mutex<Option<Map<String, Value>>>,
    fail_inserts: AtomicBool,
    reject_uploads: AtomicBool,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let bearer = format!("Bearer {}", KEY);
    if header(headers, "apikey") != KEY || header(headers, "authorization") != bearer {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid API key"})),
            )
                .into_response(),
        );
    }

    None
}

fn id_filter(query: &HashMap<String, String>) -> Result<i64, Response> {
    let filter = query.get("id").map(String::as_str).unwrap_or_default();
    let raw = filter.strip_prefix("eq.").unwrap_or(filter);
    raw.parse::<i64>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "22P02",
                "details": null,
                "hint": null,
                "message": format!("invalid input syntax for type bigint: \"{}\"", raw)
            })),
        )
            .into_response()
    })
}

async fn select(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    *mock.last_order.lock().unwrap() = query.get("order").cloned();

    let rows = mock.rows.lock().unwrap().clone();
    if !query.contains_key("id") {
        return Json(rows).into_response();
    }

    match id_filter(&query) {
        Ok(id) => Json(rows.into_iter().filter(|r| r["id"] == id).collect::<Vec<_>>()).into_response(),
        Err(resp) => resp,
    }
}

async fn insert(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Json(body): Json<Vec<Value>>,
) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    if mock.fail_inserts.load(Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"code": "42501", "message": "permission denied for table worksheets"})),
        )
            .into_response();
    }
    if header(&headers, "prefer") != "return=representation" {
        return StatusCode::CREATED.into_response();
    }

    let mut created = Vec::new();
    let mut rows = mock.rows.lock().unwrap();
    for mut row in body {
        let id = mock.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        row["id"] = json!(id);
        row["created_at"] = json!(chrono::Utc::now().to_rfc3339());
        rows.push(row.clone());
        created.push(row);
    }

    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Map<String, Value>>,
) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    let id = match id_filter(&query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    *mock.last_patch.lock().unwrap() = Some(patch.clone());

    let mut rows = mock.rows.lock().unwrap();
    let mut updated = Vec::new();
    for row in rows.iter_mut().filter(|r| r["id"] == id) {
        for (k, v) in &patch {
            row[k.as_str()] = v.clone();
        }
        updated.push(row.clone());
    }

    Json(updated).into_response()
}

async fn put_object(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    if header(&headers, "x-upsert") != "false" {
        return (StatusCode::BAD_REQUEST, "uploads must not overwrite").into_response();
    }
    if mock.reject_uploads.load(Ordering::SeqCst) {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({
                "statusCode": "413",
                "error": "Payload too large",
                "message": "The object exceeded the maximum allowed size"
            })),
        )
            .into_response();
    }

    let path = format!("{}/{}", bucket, key);
    let mut objects = mock.objects.lock().unwrap();
    if objects.contains_key(&path) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"statusCode": "409", "error": "Duplicate", "message": "The resource already exists"})),
        )
            .into_response();
    }
    let content_type = header(&headers, "content-type").to_string();
    objects.insert(path.clone(), (content_type, body.to_vec()));

    Json(json!({ "Key": path })).into_response()
}

async fn auth_user(headers: HeaderMap) -> Response {
    if header(&headers, "apikey") != KEY {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid API key"}))).into_response();
    }

    match header(&headers, "authorization") {
        "Bearer admin-token" => Json(json!({
            "id": "u-1",
            "email": "admin@example.com",
            "role": "authenticated",
            "app_metadata": {"provider": "email", "role": "admin"},
            "user_metadata": {"full_name": "Site Admin"}
        }))
        .into_response(),
        "Bearer reader-token" => Json(json!({
            "id": "u-2",
            "email": "reader@example.com",
            "role": "authenticated",
            "app_metadata": {"provider": "email"}
        }))
        .into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))).into_response(),
    }
}

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "title": "Fractions Warmup",
            "description": "Adding and simplifying fractions.",
            "category": "Pre-Algebra",
            "difficulty": "Beginner",
            "file_url": "https://cdn/fractions.pdf",
            "preview_image_url": null,
            "download_count": null,
            "topics": null,
            "pages": 2,
            "created_at": "2024-01-01T08:00:00+00:00"
        }),
        json!({
            "id": 2,
            "title": "Unit Circle",
            "description": "Radians and reference angles.",
            "category": "Trigonometry",
            "difficulty": "Intermediate",
            "file_url": "https://cdn/unit-circle.pdf",
            "preview_image_url": "https://cdn/unit-circle.png",
            "download_count": 12,
            "topics": ["Radians"],
            "pages": null,
            "created_at": "2024-03-01T10:30:00.5+00:00"
        }),
    ]
}

async fn start() -> (Arc<Mock>, String) {
    let mock = Arc::new(Mock::default());
    *mock.rows.lock().unwrap() = seed();
    mock.next_id.store(2, Ordering::SeqCst);

    let app = Router::new()
        .route(
            "/rest/v1/worksheets",
            get(select).post(insert).patch(update),
        )
        .route("/storage/v1/object/:bucket/*key", post(put_object))
        .route("/auth/v1/user", get(auth_user))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (mock, format!("http://{}", addr))
}

fn backend(url: &str, token: Option<&str>) -> RemoteBackend {
    let mut opts = RemoteOptions::new(url, KEY);
    opts.access_token = token.map(String::from);
    RemoteBackend::new(opts).unwrap()
}

fn algebra_practice() -> WorksheetDraft {
    WorksheetDraft::new(
        "Algebra Practice",
        "Solve linear equations and small systems.",
        "Algebra",
        "Intermediate",
    )
    .with_file_url("https://x/a.pdf")
    .with_topics(["Linear Equations", "Systems"])
    .with_pages(6)
}

#[tokio::test]
async fn list_maps_rows_and_orders_newest_first() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let records = backend.list(&SortSpec::default()).await.unwrap();
    assert_eq!(
        mock.last_order.lock().unwrap().as_deref(),
        Some("created_at.desc")
    );

    let ids: Vec<&str> = records.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(records[1].download_count, 0);
    assert!(records[1].topics.is_empty());
    assert_eq!(records[1].pages, Some(2));
    assert_eq!(records[0].pages, None);
    assert_eq!(
        records[0].preview_image_url.as_deref(),
        Some("https://cdn/unit-circle.png")
    );

    backend
        .list(&SortSpec::ascending(SortField::DownloadCount))
        .await
        .unwrap();
    assert_eq!(
        mock.last_order.lock().unwrap().as_deref(),
        Some("download_count.asc")
    );
}

#[tokio::test]
async fn create_then_update_download_count() {
    let (_mock, url) = start().await;
    let backend = backend(&url, None);

    let created = backend.create(algebra_practice()).await.unwrap();
    assert_eq!(created.id, "3");
    assert_eq!(created.download_count, 0);
    assert_eq!(created.topics, vec!["Linear Equations", "Systems"]);
    assert_eq!(created.pages, Some(6));

    let updated = backend
        .update(&created.id, WorksheetPatch::download_count(1))
        .await
        .unwrap();
    let mut expected = created.clone();
    expected.download_count = 1;
    assert_eq!(updated, expected);

    assert_eq!(backend.get(&created.id).await.unwrap(), expected);
}

#[tokio::test]
async fn null_patch_clears_preview() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let patch: WorksheetPatch = serde_json::from_str(r#"{"preview_image_url": null}"#).unwrap();
    let updated = backend.update("2", patch).await.unwrap();
    assert_eq!(updated.preview_image_url, None);
    assert_eq!(updated.download_count, 12);

    let sent = mock.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(Value::Object(sent), json!({"preview_image_url": null}));
    assert_eq!(backend.get("2").await.unwrap().preview_image_url, None);
}

#[tokio::test]
async fn download_count_never_decreases() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let err = backend
        .update("2", WorksheetPatch::download_count(3))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(mock.last_patch.lock().unwrap().is_none());
    assert_eq!(*mock.rows.lock().unwrap(), seed());

    let updated = backend
        .update("2", WorksheetPatch::download_count(13))
        .await
        .unwrap();
    assert_eq!(updated.download_count, 13);
}

#[tokio::test]
async fn validation_fails_before_any_request() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let mut draft = algebra_practice();
    draft.category = None;
    let err = backend.create(draft).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 0);
    assert_eq!(mock.rows.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let err = backend
        .update("404", WorksheetPatch::download_count(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // an id the id column cannot hold
    let err = backend
        .update("worksheet-1", WorksheetPatch::download_count(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = backend.get("worksheet-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(*mock.rows.lock().unwrap(), seed());
}

#[tokio::test]
async fn insert_fault_carries_backend_message() {
    let (mock, url) = start().await;
    mock.fail_inserts.store(true, Ordering::SeqCst);
    let backend = backend(&url, None);

    let err = backend.create(algebra_practice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err
        .to_string()
        .contains("permission denied for table worksheets"));
}

#[tokio::test]
async fn wrong_key_is_a_backend_error() {
    let (_mock, url) = start().await;
    let backend = RemoteBackend::new(RemoteOptions::new(&url, "wrong")).unwrap();

    let err = backend.list(&SortSpec::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn upload_stores_object_and_returns_public_url() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let first = backend
        .upload_file(FilePayload::new("Algebra.PDF", "%PDF-1.4"))
        .await
        .unwrap();
    let second = backend
        .upload_file(FilePayload::new("Algebra.PDF", "%PDF-1.4"))
        .await
        .unwrap();
    assert_ne!(first, second);

    let prefix = format!("{}/storage/v1/object/public/worksheet-files/", url);
    let key = first.file_url.strip_prefix(&prefix).unwrap();
    assert!(key.ends_with(".pdf"));

    let objects = mock.objects.lock().unwrap();
    let (content_type, bytes) = &objects[&format!("worksheet-files/{}", key)];
    assert_eq!(content_type, "application/pdf");
    assert_eq!(bytes, b"%PDF-1.4");
}

#[tokio::test]
async fn upload_failures_are_upload_errors() {
    let (mock, url) = start().await;
    let backend = backend(&url, None);

    let err = backend
        .upload_file(FilePayload::new("a.pdf", Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upload);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 0);

    mock.reject_uploads.store(true, Ordering::SeqCst);
    let err = backend
        .upload_file(FilePayload::new("a.pdf", "%PDF"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upload);
    assert_eq!(
        err.to_string(),
        "Storage upload failed: The object exceeded the maximum allowed size"
    );
}

#[tokio::test]
async fn me_resolves_session_user() {
    let (_mock, url) = start().await;

    let actor = backend(&url, Some("admin-token")).me().await.unwrap();
    assert_eq!(actor.id, "u-1");
    assert!(actor.is_admin());
    assert_eq!(actor.name.as_deref(), Some("Site Admin"));

    let actor = backend(&url, Some("reader-token")).me().await.unwrap();
    assert!(!actor.is_admin());

    assert_eq!(backend(&url, Some("expired")).me().await, None);
    assert_eq!(backend(&url, None).me().await, None);
}

#[tokio::test]
async fn me_never_fails_when_unreachable() {
    let mut opts = RemoteOptions::new("http://127.0.0.1:9", KEY);
    opts.access_token = Some("admin-token".into());
    let backend = RemoteBackend::new(opts).unwrap();

    assert_eq!(backend.me().await, None);
    let err = backend.list(&SortSpec::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}

#[tokio::test]
async fn publish_uploads_files_then_inserts() {
    let (mock, url) = start().await;
    let client = CatalogClient::new(backend(&url, None));

    let created = client
        .publish(Submission {
            draft: WorksheetDraft::new("Ratios", "Ratio drills", "Pre-Algebra", "Beginner"),
            file: FilePayload::new("ratios.pdf", "%PDF-1.4"),
            preview: Some(FilePayload::new("ratios.png", vec![0x89, 0x50, 0x4e, 0x47])),
        })
        .await
        .unwrap();

    assert_eq!(mock.objects.lock().unwrap().len(), 2);
    assert!(created.file_url.ends_with(".pdf"));
    assert!(created.preview_image_url.unwrap().ends_with(".png"));

    let downloaded = client.record_download(&created.id).await.unwrap();
    assert_eq!(downloaded.download_count, 1);
    assert_eq!(client.stats().await.unwrap().downloads, 13);
}
