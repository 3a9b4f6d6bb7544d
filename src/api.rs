//! JSON endpoints: `/api/verify` and `/health`.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::any::Any;
use tracing::info;

use crate::document::UploadedDocument;
use crate::error::VerifyError;
use crate::schema::{HealthStatus, VerificationResult};
use crate::AppState;

/// Name of the multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        ocr_available: state.verifier.ocr_available(),
        pdf_available: state.verifier.pdf_available(),
    })
}

/// Upload an image or PDF and get the OCR verdict.
pub async fn verify_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VerificationResult>, VerifyError> {
    let mut multipart = multipart.map_err(|e| VerifyError::MissingFile(e.body_text()))?;
    let doc = read_upload(&mut multipart).await?;

    info!(
        "Received file: {} ({} bytes, sha256 {})",
        doc.file_name(),
        doc.data().len(),
        doc.hash()
    );

    let verifier = state.verifier.clone();
    let result = tokio::task::spawn_blocking(move || verifier.verify(&doc))
        .await
        .map_err(|e| {
            VerifyError::Internal(anyhow::Error::new(e).context("verification worker failed"))
        })??;

    Ok(Json(result))
}

/// Pull the `file` field out of the form, ignoring any other fields.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadedDocument, VerifyError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedDocument::new(file_name.as_deref(), data.to_vec()));
    }
    Err(VerifyError::MissingFile(
        "the form has no field named 'file'".to_string(),
    ))
}

fn multipart_error(e: MultipartError) -> VerifyError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VerifyError::UploadTooLarge(e.body_text())
    } else {
        VerifyError::MissingFile(e.body_text())
    }
}

/// Turn a handler panic into the usual internal-error JSON.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    VerifyError::Internal(anyhow::anyhow!("request handler panicked: {}", message)).into_response()
}
