//! # Request/Response Tracing
//!
//! Per-request spans via `tower_http::trace::TraceLayer`. The span records
//! method and path only; query strings are left out because provider-style
//! clients sometimes put keys there.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

type MakeSpan = fn(&Request<axum::body::Body>) -> tracing::Span;

/// Build the gateway's `TraceLayer`.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeSpan> {
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

fn request_span(request: &Request<axum::body::Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}
