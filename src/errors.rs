// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to decode image data: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for StudioError {
    fn from(err: std::io::Error) -> Self {
        StudioError::Io(err.to_string())
    }
}

impl From<image::ImageError> for StudioError {
    fn from(err: image::ImageError) -> Self {
        StudioError::ImageProcessing(err.to_string())
    }
}

impl StudioError {
    fn summary(&self) -> &'static str {
        match self {
            StudioError::Validation(_) => "Invalid request",
            StudioError::NotFound(_) => "Resource not found",
            StudioError::Decode(_) => "Upload failed",
            StudioError::Io(_) => "Processing failed",
            StudioError::ImageProcessing(_) => "Image processing error",
            StudioError::ExternalService(_) => "AI service error",
            StudioError::Config(_) => "Server misconfigured",
        }
    }
}

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudioError::Validation(_) => StatusCode::BAD_REQUEST,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
            StudioError::Decode(_)
            | StudioError::Io(_)
            | StudioError::ImageProcessing(_)
            | StudioError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.summary(),
            "error": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = StudioError::Validation("Missing required fields: image_data and format".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing required fields: image_data and format");
    }

    #[test]
    fn decode_and_io_map_to_internal_error() {
        assert_eq!(
            StudioError::Decode("bad padding".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io: StudioError = std::io::Error::other("disk full").into();
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(io.to_string().contains("disk full"));
    }
}
