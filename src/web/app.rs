//! Main entrypoint for the web application

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension},
    http::Request,
    routing::post,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    trace::{
        DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
    },
    LatencyUnit,
};
use tracing::Level;

use crate::config::Settings;
use crate::mail::Mailer;
use crate::vars::MAX_BODY_BYTES;
use crate::web::{handlers, serve_static};

/// Shared, read-only state of every request
#[derive(Debug)]
pub struct AppState {
    pub mailer: Mailer,
    pub static_folder: PathBuf,
}

impl AppState {
    pub fn new(mailer: Mailer, static_folder: PathBuf) -> Self {
        AppState {
            mailer,
            static_folder,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        AppState::new(
            Mailer::from_settings(settings),
            settings.static_folder.clone(),
        )
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/apply", post(handlers::apply))
        .fallback(serve_static::handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "http-request",
                        method = request.method().as_str(),
                        uri = request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        .layer(CompressionLayer::new())
}
