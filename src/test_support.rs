// src/test_support.rs
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

/// A smooth two-axis gradient, encoded as JPEG.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Jpeg(95))
        .expect("encode test jpeg");
    out
}

/// Mock-mode application state rooted at `dir`, with no apply delay.
pub async fn mock_state(dir: &std::path::Path) -> crate::AppState {
    mock_state_at(dir, "http://localhost:8080").await
}

pub async fn mock_state_at(dir: &std::path::Path, public_base_url: &str) -> crate::AppState {
    use crate::services::{
        AnalysisClient, FilterEngine, MakeupService, ServiceOptions, StyleCatalog, UploadStore,
    };
    use std::sync::Arc;

    let store = Arc::new(UploadStore::open(dir).await.expect("open upload store"));
    let analysis = Arc::new(AnalysisClient::mock(Arc::new(FilterEngine::new())));
    crate::AppState {
        makeup_service: Arc::new(MakeupService::new(
            store,
            analysis,
            Arc::new(StyleCatalog::builtin()),
            ServiceOptions {
                public_base_url: public_base_url.to_string(),
                apply_delay: std::time::Duration::ZERO,
                strict_results: false,
                result_capacity: 100,
            },
        )),
    }
}
