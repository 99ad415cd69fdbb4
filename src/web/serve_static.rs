//! Usage:
//! Setting `STATIC_FOLDER` in OS env or `.env` file such as
//! `STATIC_FOLDER=name_of_folder`, then routing everything else here:
//! ```ignore
//! let app = Router::new().fallback(serve_static::handler);
//! ```
//!
//! This was yanked from <https://github.com/tokio-rs/axum/discussions/446>

use axum::{
    body::Body,
    extract::Extension,
    http::{Method, Request, Response, StatusCode, Uri},
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::web::app::AppState;

pub async fn handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response<Body>, (StatusCode, String)> {
    if method != Method::GET && method != Method::HEAD {
        return Err((
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        ));
    }

    let folder = state.static_folder.as_path();
    let res = get_static_file(folder, &method, uri.clone()).await?;

    if res.status() == StatusCode::NOT_FOUND && !uri.path().ends_with('/') {
        // try with `.html`, query parameters don't matter for files
        match format!("{}.html", uri.path()).parse() {
            Ok(uri_html) => get_static_file(folder, &method, uri_html).await,
            Err(_) => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid URI".to_string(),
            )),
        }
    } else {
        Ok(res)
    }
}

async fn get_static_file(
    folder: &Path,
    method: &Method,
    uri: Uri,
) -> Result<Response<Body>, (StatusCode, String)> {
    let req = Request::builder()
        .method(method.clone())
        .uri(uri)
        .body(Body::empty())
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    // `ServeDir` implements `tower::Service` so,
    // we can call it with `tower::ServiceExt::oneshot`
    match ServeDir::new(folder).oneshot(req).await {
        Ok(res) => Ok(res.map(Body::new)),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {}", err),
        )),
    }
}
