// src/client.rs
use crate::errors::StudioError;
use crate::models::{
    ApiResponse, ApplyRequest, HealthStatus, MakeupStyle, ProcessingResult, UploadRequest,
    UploadedImage,
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use log::debug;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

const INVALID_TYPE: &str = "Please upload a valid image file (JPEG, PNG, or WebP)";
const TOO_LARGE: &str = "Image size must be less than 10MB";

/// Upload format for a local image path, or `None` for anything that is not
/// JPEG, PNG or WebP.
pub fn image_format_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Checks type and size before anything is sent to the server.
pub fn validate_image_file(path: &Path, size: u64) -> Result<&'static str, StudioError> {
    let format =
        image_format_for(path).ok_or_else(|| StudioError::Validation(INVALID_TYPE.to_string()))?;
    if size > MAX_IMAGE_BYTES {
        return Err(StudioError::Validation(TOO_LARGE.to_string()));
    }
    Ok(format)
}

pub fn encode_image(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// HTTP client for the `/api/v1` surface.
#[derive(Clone)]
pub struct StudioClient {
    base_url: String,
    http: reqwest::Client,
}

impl StudioClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StudioError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StudioError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, StudioError> {
        self.get("/api/v1/health").await
    }

    pub async fn styles(&self) -> Result<Vec<MakeupStyle>, StudioError> {
        self.get("/api/v1/makeup/styles").await
    }

    pub async fn upload_image(
        &self,
        image_data: String,
        format: &str,
    ) -> Result<UploadedImage, StudioError> {
        let body = UploadRequest {
            image_data: Some(image_data),
            format: Some(format.to_string()),
        };
        self.post("/api/v1/makeup/upload", &body).await
    }

    pub async fn apply_style(
        &self,
        image_id: &str,
        style_id: &str,
    ) -> Result<ProcessingResult, StudioError> {
        let body = ApplyRequest {
            image_id: Some(image_id.to_string()),
            style_id: Some(style_id.to_string()),
        };
        self.post(&format!("/api/v1/makeup/apply/{}", style_id), &body)
            .await
    }

    pub async fn result(&self, id: &str) -> Result<ProcessingResult, StudioError> {
        self.get(&format!("/api/v1/makeup/result/{}", id)).await
    }

    /// Fetches a result image by its absolute URL.
    pub async fn download(&self, url: &str) -> Result<Bytes, StudioError> {
        let resp = self.http.get(url).send().await.map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(StudioError::ExternalService(format!(
                "Download of {} failed with status {}",
                url,
                resp.status()
            )));
        }
        resp.bytes().await.map_err(request_error)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StudioError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let resp = self.http.get(&url).send().await.map_err(request_error)?;
        unwrap_envelope(resp).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, StudioError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        unwrap_envelope(resp).await
    }
}

fn request_error(e: reqwest::Error) -> StudioError {
    StudioError::ExternalService(e.to_string())
}

async fn unwrap_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, StudioError> {
    let status = resp.status();
    let envelope: ApiResponse<T> = resp.json().await.map_err(|e| {
        StudioError::ExternalService(format!("Unreadable response ({}): {}", status, e))
    })?;

    match envelope.data {
        Some(data) if envelope.success => Ok(data),
        _ => Err(StudioError::ExternalService(
            envelope
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or(envelope.message),
        )),
    }
}
