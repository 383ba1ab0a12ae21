//! The bridge's HTTP surface: the embedded dashboard, the `/ws` upgrade, and
//! the `/healthz`/`/readyz` probes.
//!
//! Grounded on the teacher's `build_router` (route list, `ServeDir`/
//! `ServeFile` fallback shape) generalized from a multi-route API surface
//! down to the handful of routes this bridge actually needs, plus
//! `rt-ui-http`'s `serve_embedded_ui`/`rust_embed::Embed` idiom for the
//! single-page dashboard asset.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rust_embed::RustEmbed;

use crate::ws::ws_handler;
use crate::AppState;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .fallback(serve_dashboard)
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.pool.is_running() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn serve_dashboard(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    match Assets::get(path) {
        Some(file) => {
            // §6 mandates the literal `text/html; charset=utf-8` for the
            // dashboard HTML; `mime_guess` alone yields a bare `text/html`
            // with no charset.
            let content_type = if path.ends_with(".html") {
                "text/html; charset=utf-8".to_string()
            } else {
                mime_guess::from_path(path).first_or_octet_stream().as_ref().to_string()
            };
            (StatusCode::OK, [(axum::http::header::CONTENT_TYPE, content_type)], file.data).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
