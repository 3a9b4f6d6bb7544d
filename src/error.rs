//! Request-level error taxonomy and its JSON wire form.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

use crate::ocr::OcrError;
use crate::pdf::RasterizeError;

/// Everything that can stop `/api/verify` from producing a result.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("multipart form must include a field named 'file': {0}")]
    MissingFile(String),

    #[error("upload exceeds the size limit: {0}")]
    UploadTooLarge(String),

    #[error("Install pdftoppm (poppler-utils) to enable PDF support.")]
    RasterizerMissing,

    #[error("PDF conversion failed")]
    PdfConversion(#[source] RasterizeError),

    #[error("cannot decode image")]
    ImageDecode(#[source] image::ImageError),

    #[error("OCR engine is not available")]
    RecognizerUnavailable,

    #[error("OCR failed")]
    Ocr(#[source] OcrError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl VerifyError {
    /// Stable error code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFile(_) => "no file part named 'file' in request",
            Self::UploadTooLarge(_) => "file_too_large",
            Self::RasterizerMissing => "pdf_uploaded_but_pdf2image_missing",
            Self::PdfConversion(_) => "pdf_conversion_failed",
            Self::ImageDecode(_) => "cannot_read_image",
            Self::RecognizerUnavailable | Self::Ocr(_) => "ocr_failed",
            Self::Internal(_) => "internal_server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile(_) | Self::RasterizerMissing | Self::ImageDecode(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::PdfConversion(_)
            | Self::RecognizerUnavailable
            | Self::Ocr(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let trace = self.status().is_server_error().then(|| diagnostic_trace(self));
        ErrorBody {
            error: self.code().to_string(),
            details: error_chain(self),
            trace,
        }
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            error!("{}: {:?}", self.code(), self);
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// One-line form of an error and its causes, `outer: inner: ...`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut line = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        line.push_str(": ");
        line.push_str(&cause.to_string());
        source = cause.source();
    }
    line
}

/// Render an error and its `source()` chain, one cause per line.
pub fn diagnostic_trace(err: &(dyn std::error::Error + 'static)) -> String {
    let mut trace = format!("{}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}
