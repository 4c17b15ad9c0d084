// src/services/mod.rs
pub mod analysis;
pub mod filter_engine;
pub mod gemini;
pub mod makeup_service;
pub mod style_catalog;
pub mod upload_store;

pub use analysis::AnalysisClient;
pub use filter_engine::FilterEngine;
pub use makeup_service::{MakeupService, ServiceOptions};
pub use style_catalog::StyleCatalog;
pub use upload_store::UploadStore;
