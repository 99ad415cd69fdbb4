use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::form::{self, boundary_from_content_type};
use crate::vars::{REQUIRED_FIELDS, REQUIRED_FILES};
use crate::web::app::AppState;
use crate::web::errors::ApiError;

/// JSON body of every `/api/apply` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApplyResponse {
    pub fn success() -> Self {
        ApplyResponse {
            ok: true,
            message: None,
        }
    }

    pub fn failed(message: String) -> Self {
        ApplyResponse {
            ok: false,
            message: Some(message),
        }
    }
}

pub async fn apply(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let Some(boundary) = boundary_from_content_type(content_type) else {
        debug!("Rejecting submission with content type {:?}", content_type);
        return Err(ApiError::MultipartRequired);
    };

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Rejecting oversized submission");
            ApiError::PayloadTooLarge
        } else {
            ApiError::UnreadableBody(rejection.body_text())
        }
    })?;

    let form = form::decode(&body, &boundary);

    let missing = form.missing(&REQUIRED_FIELDS, &REQUIRED_FILES);
    if !missing.is_empty() {
        debug!("Submission is missing {:?}", missing);
        return Err(ApiError::MissingFields(missing));
    }

    if let Err(err) = state.mailer.send_application_email(&form).await {
        error!("Application submit failed: {}", err);
        return Err(ApiError::DeliveryFailed(state.mailer.operator_hint()));
    }

    info!("Application forwarded to {}", state.mailer.envelope().to);
    Ok(Json(ApplyResponse::success()))
}
