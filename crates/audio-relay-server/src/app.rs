//! Router and request handlers.
//!
//! `GET /api/audio-proxy?src=...` honors the inbound `Range` and
//! `User-Agent` headers, mirrors the upstream status on success, and
//! maps the resolver's error taxonomy to 400/500 with a small JSON
//! error body. The upstream body is piped through without buffering.

use std::sync::Arc;

use audio_relay::{RelayError, Resolver};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Shared per-process state: just the resolver (itself stateless).
pub struct AppState {
    resolver: Resolver,
}

/// Builds the application router around a resolver.
pub fn router(resolver: Resolver) -> Router {
    Router::new()
        .route("/api/audio-proxy", get(audio_proxy))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { resolver }))
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    src: Option<String>,
}

async fn audio_proxy(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> Response {
    let Some(src) = params.src else {
        return error_response(&RelayError::MissingSource);
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    match state.resolver.resolve(&src, range, user_agent).await {
        Ok(media) => {
            let mut response = Response::new(Body::from_stream(media.body));
            *response.status_mut() = media.status;
            *response.headers_mut() = media.headers;
            response
        }
        Err(e) => error_response(&e),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(error: &RelayError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("audio proxy failed: {error}");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({ "error": error.to_string() }))).into_response()
}
