use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sweep_rs::activity::{ActivityLog, StatusStore};
use sweep_rs::dashboard::{router, DashboardView, NEVER, NO_LOGS};
use sweep_rs::PathResolver;
use tempfile::TempDir;
use tower::ServiceExt;

async fn get(paths: &PathResolver, uri: &str) -> (StatusCode, String) {
    let response = router(paths.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_page_without_any_files() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());

    let (status, body) = get(&paths, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(NO_LOGS));
    assert!(body.contains("Disconnected"));
    assert!(body.contains(NEVER));
}

#[tokio::test]
async fn test_page_shows_status_and_newest_log_first() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());

    let log = ActivityLog::new(paths.log_file());
    log.append("first event").await.unwrap();
    log.append("second event").await.unwrap();
    StatusStore::new(paths.status_file()).write(true).await.unwrap();

    let (status, body) = get(&paths, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Connected"));
    assert!(!body.contains(NEVER));
    let first = body.find("first event").unwrap();
    let second = body.find("second event").unwrap();
    assert!(second < first);
}

#[tokio::test]
async fn test_log_lines_are_html_escaped() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());
    ActivityLog::new(paths.log_file())
        .append("Deleted: <script>alert(1)</script>")
        .await
        .unwrap();

    let (_, body) = get(&paths, "/").await;
    assert!(!body.contains("<script>alert(1)</script>"));
}

#[tokio::test]
async fn test_corrupt_status_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());
    std::fs::create_dir_all(paths.status_file().parent().unwrap()).unwrap();
    std::fs::write(paths.status_file(), "{\"connected\": true, \"timest").unwrap();

    let (status, body) = get(&paths, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let view: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["status"]["connected"], false);
    assert_eq!(view["status"]["timestamp"], NEVER);
    assert_eq!(view["status"]["corrupted"], true);

    let (status, page) = get(&paths, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("The status file could not be read."));
}

#[tokio::test]
async fn test_api_status_matches_view() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());
    ActivityLog::new(paths.log_file()).append("hello").await.unwrap();
    StatusStore::new(paths.status_file()).write(false).await.unwrap();

    let (_, body) = get(&paths, "/api/status").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let view = DashboardView::load(&paths).await;

    assert_eq!(json, serde_json::to_value(&view).unwrap());
    assert_eq!(view.logs.len(), 1);
    assert!(view.status.timestamp.ends_with(" UTC"));
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());

    let (status, body) = get(&paths, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn test_no_mutation_routes() {
    let dir = TempDir::new().unwrap();
    let paths = PathResolver::from_base_dir(dir.path());

    let response = router(paths)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
