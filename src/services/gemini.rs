// src/services/gemini.rs
use crate::errors::StudioError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type.
    InlineImage { mime_type: String, data: String },
}

/// A text-producing generative model. Treated as an opaque oracle: prompt
/// parts in, free text out.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, parts: Vec<Part>) -> Result<String, StudioError>;
}

pub struct GeminiModel {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiModel {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }
}

fn request_body(parts: &[Part]) -> Value {
    let parts: Vec<Value> = parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::InlineImage { mime_type, data } => json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": data
                }
            }),
        })
        .collect();

    json!({ "contents": [{ "parts": parts }] })
}

fn extract_text(response: &Value) -> Result<String, StudioError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| StudioError::ExternalService("No content in Gemini response".to_string()))?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(StudioError::ExternalService("Gemini returned no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, StudioError> {
        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&parts))
            .send()
            .await
            .map_err(|e| StudioError::ExternalService(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(StudioError::ExternalService(format!(
                "Gemini error {}: {}",
                status, error_text
            )));
        }

        let result: Value = response.json().await.map_err(|e| {
            StudioError::ExternalService(format!("Failed to parse Gemini response: {}", e))
        })?;

        extract_text(&result)
    }
}
