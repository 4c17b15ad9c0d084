// src/services/makeup_service.rs
use crate::config::Config;
use crate::errors::StudioError;
use crate::models::{
    ApplyRequest, MakeupStyle, ProcessingResult, ProcessingStatus, UploadRequest, UploadedImage,
};
use crate::services::upload_store::generate_id;
use crate::services::{AnalysisClient, StyleCatalog, UploadStore};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const PLACEHOLDER_ANALYSIS: &str = "Beautiful makeup application completed!";

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub public_base_url: String,
    pub apply_delay: Duration,
    pub strict_results: bool,
    pub result_capacity: usize,
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            public_base_url: config.public_base_url.clone(),
            apply_delay: config.apply_delay,
            strict_results: config.strict_results,
            result_capacity: config.result_capacity,
        }
    }
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Recorded results, oldest evicted first once `capacity` is reached.
struct ResultLog {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, ProcessingResult>,
}

impl ResultLog {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, id: &str) -> Option<&ProcessingResult> {
        self.entries.get(id)
    }

    fn insert(&mut self, result: ProcessingResult) {
        if self.capacity == 0 {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(result.id.clone());
        self.entries.insert(result.id.clone(), result);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Upload, apply and result lookup. Cheap to clone; every clone shares the
/// same store and result table.
#[derive(Clone)]
pub struct MakeupService {
    store: Arc<UploadStore>,
    analysis: Arc<AnalysisClient>,
    catalog: Arc<StyleCatalog>,
    results: Arc<RwLock<ResultLog>>,
    options: ServiceOptions,
}

impl MakeupService {
    pub fn new(
        store: Arc<UploadStore>,
        analysis: Arc<AnalysisClient>,
        catalog: Arc<StyleCatalog>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            analysis,
            catalog,
            results: Arc::new(RwLock::new(ResultLog::new(options.result_capacity))),
            options,
        }
    }

    pub async fn styles(&self) -> Vec<MakeupStyle> {
        self.catalog.annotated(&self.analysis).await
    }

    pub fn style(&self, id: &str) -> Result<MakeupStyle, StudioError> {
        self.catalog
            .get(id)
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("Style {} does not exist", id)))
    }

    pub async fn upload(&self, req: UploadRequest) -> Result<UploadedImage, StudioError> {
        let (Some(image_data), Some(format)) =
            (required(req.image_data.as_deref()), required(req.format.as_deref()))
        else {
            return Err(StudioError::Validation(
                "Missing required fields: image_data and format".to_string(),
            ));
        };

        let uploaded = self.store.save_upload(image_data, format).await?;
        info!("Stored upload {} ({} bytes)", uploaded.id, uploaded.size);
        Ok(uploaded)
    }

    /// Waits the fixed delay, then processes. The work runs as its own task,
    /// so a client that hangs up does not cancel it.
    pub async fn apply(&self, req: ApplyRequest) -> Result<ProcessingResult, StudioError> {
        let (Some(image_id), Some(style_id)) =
            (required(req.image_id.as_deref()), required(req.style_id.as_deref()))
        else {
            return Err(StudioError::Validation(
                "Missing required fields: image_id and style_id".to_string(),
            ));
        };

        info!("Processing makeup application: {} for image: {}", style_id, image_id);
        let created_at = Utc::now();
        let this = self.clone();
        let (image_id, style_id) = (image_id.to_string(), style_id.to_string());

        tokio::spawn(async move {
            tokio::time::sleep(this.options.apply_delay).await;
            this.process(&image_id, &style_id, created_at).await
        })
        .await
        .map_err(|e| StudioError::Io(format!("Processing task failed: {}", e)))?
    }

    async fn process(
        &self,
        image_id: &str,
        style_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ProcessingResult, StudioError> {
        let result_id = generate_id("result");
        let result_path = self.store.result_path(&result_id);

        let analysis = match self.store.locate(image_id).await {
            Some(original) => {
                let enhancement = self.analysis.analyze_and_enhance(&original, style_id).await;
                let source = if path_exists(&enhancement.processed_image_path).await {
                    enhancement.processed_image_path.as_path()
                } else {
                    warn!("Enhanced image missing, using original {}", original.display());
                    original.as_path()
                };
                if let Err(e) = tokio::fs::copy(source, &result_path).await {
                    warn!("Copying {} failed ({}), writing placeholder", source.display(), e);
                    self.store.write_placeholder(&result_path).await?;
                }
                enhancement.analysis
            }
            None => {
                warn!("No upload found for {}, writing placeholder result", image_id);
                self.store.write_placeholder(&result_path).await?;
                PLACEHOLDER_ANALYSIS.to_string()
            }
        };

        let result = ProcessingResult {
            id: result_id.clone(),
            original_id: image_id.to_string(),
            style_id: style_id.to_string(),
            status: ProcessingStatus::Completed,
            result_url: Some(self.url_for(&format!("{}.jpg", result_id))),
            analysis: Some(analysis),
            error: None,
            created_at,
            completed_at: Some(Utc::now()),
        };

        self.results.write().await.insert(result.clone());
        info!("Created result image: {}", result_path.display());
        Ok(result)
    }

    /// Results produced by this process are returned as recorded. Unknown ids
    /// get a synthetic completed record unless strict lookups are enabled.
    pub async fn result(&self, id: &str) -> Result<ProcessingResult, StudioError> {
        if let Some(result) = self.results.read().await.get(id) {
            return Ok(result.clone());
        }
        if self.options.strict_results {
            return Err(StudioError::NotFound(format!("Result {} does not exist", id)));
        }

        let now = Utc::now();
        Ok(ProcessingResult {
            id: id.to_string(),
            original_id: "original_id".to_string(),
            style_id: "natural".to_string(),
            status: ProcessingStatus::Completed,
            result_url: Some(self.url_for(&format!("{}.jpg", id))),
            analysis: None,
            error: None,
            created_at: now,
            completed_at: Some(now),
        })
    }

    pub async fn recorded_results(&self) -> usize {
        self.results.read().await.len()
    }

    pub fn is_live(&self) -> bool {
        self.analysis.is_live()
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.options.public_base_url, filename)
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
