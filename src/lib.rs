// src/lib.rs
use actix_web::web;
use std::sync::Arc;

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod wizard;

#[cfg(test)]
pub(crate) mod test_support;

use crate::errors::StudioError;
use crate::handlers::{
    apply_makeup_style, get_result, get_style, health_check, list_styles, upload_image,
};
use crate::services::MakeupService;

#[derive(Clone)]
pub struct AppState {
    pub makeup_service: Arc<MakeupService>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/makeup")
                    .route("/upload", web::post().to(upload_image))
                    .route("/apply/{style}", web::post().to(apply_makeup_style))
                    .route("/styles", web::get().to(list_styles))
                    .route("/styles/{style}", web::get().to(get_style))
                    .route("/result/{id}", web::get().to(get_result)),
            ),
    );
}

/// JSON extractor settings: body size cap, and malformed bodies answered
/// with the standard 400 envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default().limit(limit).error_handler(|err, _req| {
        StudioError::Validation(format!("Invalid request format: {}", err)).into()
    })
}
