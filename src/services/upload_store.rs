// src/services/upload_store.rs
use crate::errors::StudioError;
use crate::models::UploadedImage;
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

const INDEX_FILE: &str = ".upload-index.json";

/// 1×1 JPEG written when an apply request names an image we never saw.
pub const PLACEHOLDER_JPEG_B64: &str = "/9j/4AAQSkZJRgABAQEAYABgAAD/2wBDAAYEBQYFBAYGBQYHBwYIChAKCgkJChQODwwQFxQYGBcUFhYaHSUfGhsjHBYWICwgIyYnKSopGR8tMC0oMCUoKSj/2wBDAQcHBwoIChMKChMoGhYaKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCj/wAARCAABAAEDASIAAhEBAxEB/8QAFQABAQAAAAAAAAAAAAAAAAAAAAv/xAAUEAEAAAAAAAAAAAAAAAAAAAAA/8QAFQEBAQAAAAAAAAAAAAAAAAAAAAX/xAAUEQEAAAAAAAAAAAAAAAAAAAAA/9oADAMBAAIRAxEAPwCdABmX/9k=";

/// `{prefix}_{unix millis}_{9 random chars}`, e.g. `img_1718000000000_3f9a0c2b1`.
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &random[..9])
}

/// Decodes a base64 image, with or without a `data:<mime>;base64,` prefix.
pub fn decode_image_payload(image_data: &str) -> Result<Vec<u8>, StudioError> {
    let payload = if image_data.starts_with("data:") {
        image_data
            .split_once(',')
            .map(|(_, rest)| rest)
            .ok_or_else(|| StudioError::Decode("data URL has no payload".to_string()))?
    } else {
        image_data
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| StudioError::Decode(e.to_string()))
}

fn normalize_format(format: &str) -> Result<String, StudioError> {
    let format = format.trim().to_ascii_lowercase();
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StudioError::Validation(format!("Unsupported image format: {:?}", format)));
    }
    Ok(format)
}

/// Upload directory plus a persisted id→filename index, so lookups do not
/// depend on filename prefixes.
pub struct UploadStore {
    dir: PathBuf,
    index: Mutex<HashMap<String, String>>,
}

impl UploadStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StudioError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let index = match tokio::fs::read(dir.join(INDEX_FILE)).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable upload index: {}", e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save_upload(&self, image_data: &str, format: &str) -> Result<UploadedImage, StudioError> {
        let format = normalize_format(format)?;
        let bytes = decode_image_payload(image_data)?;

        let id = generate_id("img");
        let filename = format!("{}.{}", id, format);
        let file_path = self.dir.join(&filename);
        tokio::fs::write(&file_path, &bytes).await?;

        let mut index = self.index.lock().await;
        index.insert(id.clone(), filename.clone());
        self.persist(&index).await?;

        Ok(UploadedImage {
            id,
            filename,
            file_path: file_path.to_string_lossy().into_owned(),
            format,
            size: bytes.len() as u64,
        })
    }

    /// Finds the file for an upload id: the index first, then a directory scan
    /// for files written before the index existed. The scan only accepts a
    /// file whose stem is exactly the id.
    pub async fn locate(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return None;
        }

        if let Some(filename) = self.index.lock().await.get(id) {
            let path = self.dir.join(filename);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }

        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file && path.file_stem().is_some_and(|s| s == id) {
                candidates.push(path);
            }
        }
        candidates.sort();
        debug!("Scan for {} found {} candidate(s)", id, candidates.len());
        candidates.into_iter().next()
    }

    pub fn result_path(&self, result_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", result_id))
    }

    pub async fn write_placeholder(&self, path: &Path) -> Result<(), StudioError> {
        let bytes = general_purpose::STANDARD
            .decode(PLACEHOLDER_JPEG_B64)
            .map_err(|e| StudioError::Decode(e.to_string()))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn persist(&self, index: &HashMap<String, String>) -> Result<(), StudioError> {
        let raw = serde_json::to_vec(index).map_err(|e| StudioError::Io(e.to_string()))?;
        let tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, self.dir.join(INDEX_FILE)).await?;
        Ok(())
    }
}
