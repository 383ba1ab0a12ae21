//! Exercises the dashboard HTTP surface end to end through the router,
//! without a real MQTT broker or Redis instance.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bridge::service::AppState;
use glowplug_core::sinks::{Sinks, WebsocketSink};
use glowplug_core::WorkerPool;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;

fn make_state() -> Arc<AppState> {
    let pool = Arc::new(WorkerPool::new(Sinks::default(), CancellationToken::new()));
    Arc::new(AppState::new(pool, WebsocketSink::new()))
}

#[tokio::test]
async fn healthz_always_reports_ok() {
    let app = bridge::http::build_router(make_state());
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reflects_pool_state() {
    let app = bridge::http::build_router(make_state());
    let req = Request::builder().uri("/readyz").body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn dashboard_serves_embedded_index() {
    let app = bridge::http::build_router(make_state());
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("glowplug live metrics"));
}

#[tokio::test]
async fn dashboard_sets_html_content_type_with_charset() {
    let app = bridge::http::build_router(make_state());
    let req = Request::builder().uri("/index.html").body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(axum::http::header::CONTENT_TYPE).unwrap();
    assert_eq!(content_type, "text/html; charset=utf-8");
}

#[tokio::test]
async fn unknown_asset_is_not_found() {
    let app = bridge::http::build_router(make_state());
    let req = Request::builder().uri("/nope.js").body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
