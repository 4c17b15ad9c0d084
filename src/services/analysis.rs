// src/services/analysis.rs
use crate::config::Config;
use crate::services::FilterEngine;
use crate::services::gemini::{GeminiModel, GenerativeModel, Part};
use crate::errors::StudioError;
use base64::{Engine as _, engine::general_purpose};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MOCK_ANALYSIS: &str =
    "Mock analysis: This is a beautiful image that would look great with the selected makeup style!";

const DEFAULT_DESCRIPTION: &str =
    "Beautiful makeup enhancement with professional background styling guidance.";

pub fn style_prompt(style_id: &str) -> &'static str {
    match style_id {
        "natural" => "natural, everyday makeup with subtle enhancement perfect for intimate wedding ceremonies",
        "bridal" => "romantic bridal makeup with soft, timeless elegance for wedding photography and marriage celebrations",
        "editorial" => "high-fashion editorial makeup with bold, artistic elements suitable for avant-garde wedding photoshoots",
        "evening" => "dramatic evening makeup with glamorous appeal perfect for wedding receptions and marriage celebrations",
        "professional" => "polished professional makeup suitable for civil ceremonies and sophisticated wedding events",
        "creative" => "bold, experimental makeup with artistic flair for unique wedding themes and creative marriage celebrations",
        _ => "general makeup enhancement for romantic wedding settings",
    }
}

pub fn mock_description(style_id: &str) -> &'static str {
    match style_id {
        "natural" => "Enhance your natural beauty with subtle, fresh-faced makeup perfect for outdoor garden settings with soft natural lighting.",
        "bridal" => "Timeless bridal elegance with soft, romantic tones ideal for chapel or garden venues with dreamy atmospheric lighting.",
        "editorial" => "Bold, high-fashion makeup with dramatic elements perfect for modern studio backgrounds and professional lighting setups.",
        "evening" => "Glamorous evening makeup with rich colors designed for luxurious ballroom settings and sophisticated ambient lighting.",
        "professional" => "Polished, professional makeup that photographs beautifully in clean office environments and natural business lighting.",
        "creative" => "Experimental, artistic makeup that stands out against vibrant studio backgrounds and creative lighting arrangements.",
        _ => DEFAULT_DESCRIPTION,
    }
}

fn background_setting(style_id: &str) -> &'static str {
    match style_id {
        "natural" => "Outdoor garden or park setting with natural lighting",
        "bridal" => "Elegant chapel or romantic garden venue",
        "editorial" => "Modern studio or architectural setting",
        "evening" => "Luxurious ballroom or upscale venue",
        "professional" => "Clean office or business environment",
        "creative" => "Artistic studio or avant-garde setting",
        _ => "Softly lit romantic venue",
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

fn analysis_prompt(style: &str) -> String {
    format!(
        r#"
        You are a professional photo editor and makeup artist with advanced background removal and replacement skills. Study this portrait and give detailed instructions for:

        1. BACKGROUND REMOVAL:
           - The exact edges around the person for a precise cutout
           - Which selection method to use (magic wand, pen tool, AI selection)
           - Hair and edge refinement needed
           - Difficult areas such as loose hair or transparent elements

        2. NEW BACKGROUND for {style}:
           - The exact background scene to create or select
           - Lighting direction and colour temperature
           - Shadows and reflections required on the new background
           - Concrete background elements (architecture, nature, decor)

        3. INTEGRATION:
           - Colour grading to match the new background
           - Shadow and highlight changes
           - Edge blending and feathering
           - Atmospheric perspective

        4. MAKEUP ENHANCEMENT for the new setting:
           - {style} recommendations
           - Colour adjustments that complement the new background
           - Lighting-specific makeup changes

        Answer step by step, as if directing a professional editor in advanced editing software.
        Be very specific about background details, lighting setup and integration.
        "#
    )
}

fn visualization_prompt(style_id: &str, analysis: &str) -> String {
    format!(
        r#"
        Based on this analysis: "{excerpt}..."

        Give specific BACKGROUND REPLACEMENT instructions for a {style_id} look:

        1. BACKGROUND REMOVAL: selection technique for this person, hair and edge refinement, mask cleanup.
        2. NEW BACKGROUND for the {style_id} style: scene, props and decor, lighting setup, camera angle matching the portrait.
        3. INTEGRATION: layer blend modes, colour correction, shadow and reflection placement, final compositing.
        4. SETTING: {setting}.

        Write detailed instructions a photo editor could follow to execute this background change.
        "#,
        excerpt = preview(analysis, 500),
        setting = background_setting(style_id),
    )
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enhancement {
    pub processed_image_path: PathBuf,
    pub analysis: String,
}

/// Talks to the generative model when a credential was configured and
/// otherwise answers from static tables. The mode is fixed at construction.
pub struct AnalysisClient {
    model: Option<Arc<dyn GenerativeModel>>,
    filters: Arc<FilterEngine>,
}

impl AnalysisClient {
    pub fn new(model: Option<Arc<dyn GenerativeModel>>, filters: Arc<FilterEngine>) -> Self {
        Self { model, filters }
    }

    pub fn mock(filters: Arc<FilterEngine>) -> Self {
        Self::new(None, filters)
    }

    pub fn from_config(config: &Config, filters: Arc<FilterEngine>) -> Self {
        match &config.gemini_api_key {
            Some(key) => {
                info!("Analysis client in live mode ({})", config.gemini_model);
                let model: Arc<dyn GenerativeModel> =
                    Arc::new(GeminiModel::new(key.clone(), config.gemini_model.clone()));
                Self::new(Some(model), filters)
            }
            None => {
                warn!("GEMINI_API_KEY not set, analysis client will use mock responses");
                Self::mock(filters)
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.model.is_some()
    }

    pub async fn describe_style(&self, style_id: &str) -> String {
        let Some(model) = &self.model else {
            return mock_description(style_id).to_string();
        };

        let prompt = format!(
            "Generate a detailed, professional description for a {} makeup look. Include the key features, recommended colors, and the overall vibe of this style. Keep it under 100 words and make it appealing for customers.",
            style_prompt(style_id)
        );
        match model.generate(vec![Part::Text(prompt)]).await {
            Ok(text) => text,
            Err(e) => {
                error!("Style description failed for {}: {}", style_id, e);
                mock_description(style_id).to_string()
            }
        }
    }

    /// Returns guidance text and a filtered copy of the image. The text never
    /// influences the pixels.
    pub async fn analyze_and_enhance(&self, image_path: &Path, style_id: &str) -> Enhancement {
        let Some(model) = &self.model else {
            return Enhancement {
                processed_image_path: image_path.to_path_buf(),
                analysis: MOCK_ANALYSIS.to_string(),
            };
        };

        let analysis = match self.request_analysis(model.as_ref(), image_path, style_id).await {
            Ok(text) => {
                info!("{} analysis: {}...", model.name(), preview(&text, 200));
                Some(text)
            }
            Err(e) => {
                error!("{} processing error: {}", model.name(), e);
                None
            }
        };

        let processed_image_path = self.filtered(image_path, style_id).await;

        match analysis {
            Some(text) => {
                self.log_visualization(model.as_ref(), style_id, &text).await;
                Enhancement {
                    processed_image_path,
                    analysis: text,
                }
            }
            None => Enhancement {
                processed_image_path,
                analysis: MOCK_ANALYSIS.to_string(),
            },
        }
    }

    async fn request_analysis(
        &self,
        model: &dyn GenerativeModel,
        image_path: &Path,
        style_id: &str,
    ) -> Result<String, StudioError> {
        let bytes = tokio::fs::read(image_path).await?;
        let parts = vec![
            Part::Text(analysis_prompt(style_prompt(style_id))),
            Part::InlineImage {
                mime_type: mime_type_for(image_path).to_string(),
                data: general_purpose::STANDARD.encode(bytes),
            },
        ];
        model.generate(parts).await
    }

    async fn filtered(&self, image_path: &Path, style_id: &str) -> PathBuf {
        let filters = Arc::clone(&self.filters);
        let path = image_path.to_path_buf();
        let style = style_id.to_string();

        match tokio::task::spawn_blocking(move || filters.enhance(&path, &style)).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                error!("Filter task aborted: {}", e);
                image_path.to_path_buf()
            }
        }
    }

    async fn log_visualization(&self, model: &dyn GenerativeModel, style_id: &str, analysis: &str) {
        let prompt = visualization_prompt(style_id, analysis);
        match model.generate(vec![Part::Text(prompt)]).await {
            Ok(text) => info!("Visual description generated: {}...", preview(&text, 150)),
            Err(e) => warn!("Visualization prompt error: {}", e),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every prompt; answers from a fixed script.
    pub struct ScriptedModel {
        pub reply: Result<String, String>,
        pub calls: Mutex<Vec<Vec<Part>>>,
    }

    impl ScriptedModel {
        pub fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, parts: Vec<Part>) -> Result<String, StudioError> {
            self.calls.lock().unwrap().push(parts);
            self.reply.clone().map_err(StudioError::ExternalService)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::ScriptedModel;
    use super::*;
    use crate::test_support::sample_jpeg;

    fn live(model: Arc<ScriptedModel>) -> AnalysisClient {
        let model: Arc<dyn GenerativeModel> = model;
        AnalysisClient::new(Some(model), Arc::new(FilterEngine::new()))
    }

    #[tokio::test]
    async fn mock_descriptions_are_static() {
        let client = AnalysisClient::mock(Arc::new(FilterEngine::new()));
        assert!(!client.is_live());
        assert_eq!(client.describe_style("bridal").await, mock_description("bridal"));
        assert_eq!(client.describe_style("nonexistent-style").await, DEFAULT_DESCRIPTION);
    }

    #[tokio::test]
    async fn mock_enhancement_returns_original_path() {
        let client = AnalysisClient::mock(Arc::new(FilterEngine::new()));
        let path = Path::new("uploads/img_1_x.jpg");

        let result = client.analyze_and_enhance(path, "natural").await;

        assert_eq!(result.processed_image_path, path);
        assert_eq!(result.analysis, MOCK_ANALYSIS);
    }

    #[tokio::test]
    async fn live_analysis_sends_inline_image_and_filters_locally() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("img_1_x.png");
        std::fs::write(&original, sample_jpeg(20, 20)).unwrap();
        let model = ScriptedModel::replying("Use a warm garden backdrop.");

        let result = live(model.clone()).analyze_and_enhance(&original, "natural").await;

        assert_eq!(result.analysis, "Use a warm garden backdrop.");
        assert_eq!(result.processed_image_path, dir.path().join("img_1_x_natural_enhanced.jpg"));
        assert!(result.processed_image_path.exists());
        // analysis plus the logged visualization prompt
        assert_eq!(model.call_count(), 2);
        let calls = model.calls.lock().unwrap();
        assert!(matches!(
            &calls[0][1],
            Part::InlineImage { mime_type, .. } if mime_type == "image/png"
        ));
    }

    #[tokio::test]
    async fn live_failure_degrades_to_mock_text_with_filtered_image() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("img_2_y.jpg");
        std::fs::write(&original, sample_jpeg(20, 20)).unwrap();
        let model = ScriptedModel::failing("quota exceeded");

        let result = live(model.clone()).analyze_and_enhance(&original, "evening").await;

        assert_eq!(result.analysis, MOCK_ANALYSIS);
        assert_eq!(result.processed_image_path, dir.path().join("img_2_y_evening_enhanced.jpg"));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn live_description_falls_back_on_error() {
        let client = live(ScriptedModel::failing("offline"));
        assert_eq!(client.describe_style("creative").await, mock_description("creative"));

        let client = live(ScriptedModel::replying("Jewel tones and glitter."));
        assert_eq!(client.describe_style("creative").await, "Jewel tones and glitter.");
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a.gif")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("noext")), "image/jpeg");
    }

    #[test]
    fn previews_respect_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
    }
}
