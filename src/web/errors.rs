use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::web::handlers::ApplyResponse;

/// Everything `POST /api/apply` can fail with, rendered as
/// `{ "ok": false, "message": ... }`.
#[derive(Debug)]
pub enum ApiError {
    MultipartRequired,
    UnreadableBody(String),
    MissingFields(Vec<&'static str>),
    PayloadTooLarge,
    /// Carries the hint shown to whoever operates the site
    DeliveryFailed(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MultipartRequired
            | ApiError::UnreadableBody(_)
            | ApiError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DeliveryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MultipartRequired => {
                "multipart/form-data required".to_owned()
            }
            ApiError::UnreadableBody(reason) => {
                format!("could not read request body: {}", reason)
            }
            ApiError::MissingFields(_) => "missing required fields".to_owned(),
            ApiError::PayloadTooLarge => "file too large".to_owned(),
            ApiError::DeliveryFailed(hint) => hint.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ApplyResponse::failed(self.message()));

        let mut response = (status, body).into_response();
        if let ApiError::PayloadTooLarge = self {
            // whatever is left of the upload is not worth reading
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        response
    }
}
