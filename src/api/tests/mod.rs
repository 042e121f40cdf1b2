use super::*;
use crate::Config;
use crate::extractor::MediaExtractor;
use crate::extractor::test_helpers::FakeExtractor;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Build application state around `extractor` with its temp area in a fresh directory
fn test_state(extractor: Arc<FakeExtractor>, configure: impl FnOnce(&mut Config)) -> (AppState, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.path().to_path_buf();
    configure(&mut config);

    let extractor: Arc<dyn MediaExtractor> = extractor;
    (AppState::new(Arc::new(config), extractor), temp_dir)
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_serves_until_shutdown() {
    let (state, _temp_dir) = test_state(Arc::new(FakeExtractor::new()), |_| {});
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (state, _temp_dir) = test_state(Arc::new(FakeExtractor::new()), |config| {
        config.server.cors_enabled = true;
        config.server.cors_origins = vec!["*".to_string()];
    });
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (state, _temp_dir) = test_state(Arc::new(FakeExtractor::new()), |config| {
        config.server.cors_enabled = false;
    });
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (state, _temp_dir) = test_state(Arc::new(FakeExtractor::new()), |config| {
        config.server.cors_origins = vec!["http://allowed.example".to_string()];
    });
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://other.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (state, _temp_dir) = test_state(Arc::new(FakeExtractor::new()), |_| {});
    let response = get(create_router(state), "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
