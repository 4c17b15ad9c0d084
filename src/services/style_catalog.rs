// src/services/style_catalog.rs
use crate::models::{MakeupStyle, StyleCategory};
use crate::services::AnalysisClient;
use futures_util::future::join_all;

pub struct StyleCatalog {
    styles: Vec<MakeupStyle>,
}

fn style(id: &str, name: &str, description: &str, category: StyleCategory, intensity: u8) -> MakeupStyle {
    MakeupStyle {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        intensity,
        preview_url: None,
    }
}

impl StyleCatalog {
    pub fn builtin() -> Self {
        Self {
            styles: vec![
                style("natural", "Natural Beauty", "Subtle enhancement for everyday wear", StyleCategory::Everyday, 3),
                style("bridal", "Bridal Glow", "Romantic and timeless bridal makeup", StyleCategory::Bridal, 6),
                style("editorial", "Editorial Bold", "High-fashion editorial look", StyleCategory::Editorial, 9),
                style("evening", "Evening Glam", "Dramatic evening makeup", StyleCategory::SpecialEvent, 8),
                style("professional", "Professional Polish", "Business-appropriate makeup", StyleCategory::Everyday, 4),
                style("creative", "Creative Artistry", "Bold and experimental makeup", StyleCategory::Editorial, 10),
            ],
        }
    }

    pub fn all(&self) -> &[MakeupStyle] {
        &self.styles
    }

    pub fn get(&self, id: &str) -> Option<&MakeupStyle> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// Every style with its description regenerated for this request. All
    /// annotations run concurrently; an empty annotation keeps the static text.
    pub async fn annotated(&self, analysis: &AnalysisClient) -> Vec<MakeupStyle> {
        let descriptions = join_all(self.styles.iter().map(|s| analysis.describe_style(&s.id))).await;

        self.styles
            .iter()
            .zip(descriptions)
            .map(|(style, description)| {
                let mut style = style.clone();
                if !description.trim().is_empty() {
                    style.description = description;
                }
                style
            })
            .collect()
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
