//! Error types for specview-web
//!
//! Every failure leaves the service as
//! `{"error": {"code": "<CODE>", "message": "..."}}` with a status per code.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use specview_common::FilenameRejection;
use thiserror::Error;
use tracing::{error, warn};

use crate::audio::AudioError;
use crate::render::RenderError;
use crate::spectrum::SpectrumError;
use crate::transform::TransformError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload request has no `file` field (400)
    #[error("No file part in the request")]
    MissingFileField,

    /// Zero-byte upload (400)
    #[error("Uploaded file is empty")]
    EmptyUpload,

    /// Name has no extension or one outside the allowed set (400)
    #[error("Wrong format, file not uploaded: {0}")]
    UnsupportedFormat(String),

    /// Name would escape the storage root (400)
    #[error("Unsafe filename: {0}")]
    UnsafeFilename(String),

    /// Sanitized name leaves no room for temporary and artifact names (400)
    #[error("Filename too long: {0}")]
    FilenameTooLong(String),

    /// Multipart body could not be parsed (400)
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// Body over the configured limit (413)
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Stored file is not decodable audio (422)
    #[error("Could not decode audio: {0}")]
    DecodeFailed(String),

    /// Stored audio runs past the analysis duration limit (422)
    #[error("Audio too long: {0}")]
    AudioTooLong(String),

    /// Drawing or encoding the image failed (500)
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFileField
            | ApiError::EmptyUpload
            | ApiError::UnsupportedFormat(_)
            | ApiError::UnsafeFilename(_)
            | ApiError::FilenameTooLong(_)
            | ApiError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DecodeFailed(_) | ApiError::AudioTooLong(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::RenderFailed(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFileField => "MISSING_FILE_FIELD",
            ApiError::EmptyUpload => "EMPTY_UPLOAD",
            ApiError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ApiError::UnsafeFilename(_) => "UNSAFE_FILENAME",
            ApiError::FilenameTooLong(_) => "FILENAME_TOO_LONG",
            ApiError::MalformedUpload(_) => "MALFORMED_UPLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DecodeFailed(_) => "DECODE_FAILED",
            ApiError::AudioTooLong(_) => "AUDIO_TOO_LONG",
            ApiError::RenderFailed(_) => "RENDER_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Io(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("{} ({}): {}", status, code, message);
        } else {
            warn!("Rejected request ({}): {}", code, message);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<FilenameRejection> for ApiError {
    fn from(rejection: FilenameRejection) -> Self {
        match rejection {
            FilenameRejection::TooLong { .. } => ApiError::FilenameTooLong(rejection.to_string()),
            _ if rejection.is_unsupported_format() => {
                ApiError::UnsupportedFormat(rejection.to_string())
            }
            _ => ApiError::UnsafeFilename(rejection.to_string()),
        }
    }
}

impl From<specview_common::Error> for ApiError {
    fn from(err: specview_common::Error) -> Self {
        use specview_common::Error;
        match err {
            Error::InvalidFilename(rejection) => rejection.into(),
            Error::NotFound(name) => ApiError::NotFound(name),
            Error::Io(e) => ApiError::Io(e),
            Error::Config(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AudioError> for ApiError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::TooLong { .. } => ApiError::AudioTooLong(err.to_string()),
            _ if err.is_not_found() => ApiError::NotFound(err.to_string()),
            _ => ApiError::DecodeFailed(err.to_string()),
        }
    }
}

impl From<SpectrumError> for ApiError {
    fn from(err: SpectrumError) -> Self {
        match err {
            // Too little audio to analyse
            SpectrumError::EmptySignal => ApiError::DecodeFailed(err.to_string()),
            SpectrumError::InvalidParameter { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        ApiError::RenderFailed(err.to_string())
    }
}

impl From<TransformError> for ApiError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Audio(e) => e.into(),
            TransformError::Spectrum(e) => e.into(),
            TransformError::Render(e) => e.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::MalformedUpload(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Background task failed: {}", err))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_rejections_map_to_distinct_codes() {
        let unsupported: ApiError = FilenameRejection::MissingExtension.into();
        assert_eq!(unsupported.code(), "UNSUPPORTED_FORMAT");
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);

        let unsafe_name: ApiError = FilenameRejection::UnsafePath("../x.wav".into()).into();
        assert_eq!(unsafe_name.code(), "UNSAFE_FILENAME");

        let too_long: ApiError = FilenameRejection::TooLong { len: 264, max: 208 }.into();
        assert_eq!(too_long.code(), "FILENAME_TOO_LONG");
        assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_common_not_found_is_404() {
        let err: ApiError = specview_common::Error::NotFound("gone.wav".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_audio_errors() {
        let missing = AudioError::Open {
            path: "x.wav".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(ApiError::from(missing).code(), "NOT_FOUND");
        assert_eq!(ApiError::from(AudioError::Empty).code(), "DECODE_FAILED");
        assert_eq!(
            ApiError::from(AudioError::Empty).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let too_long = ApiError::from(AudioError::TooLong { limit_secs: 300.0 });
        assert_eq!(too_long.code(), "AUDIO_TOO_LONG");
        assert_eq!(too_long.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
