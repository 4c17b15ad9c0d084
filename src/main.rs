// src/main.rs
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use glam_studio::config::Config;
use glam_studio::services::{
    AnalysisClient, FilterEngine, MakeupService, ServiceOptions, StyleCatalog, UploadStore,
};
use glam_studio::{AppState, configure_routes, json_config};
use log::info;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Glam Studio service...");
    let config = Config::from_env()?;

    // Initialize services
    let store = Arc::new(UploadStore::open(&config.upload_dir).await?);
    let upload_dir = store.dir().to_path_buf();
    let filter_engine = Arc::new(FilterEngine::new());
    let analysis = Arc::new(AnalysisClient::from_config(&config, filter_engine));
    let makeup_service = Arc::new(MakeupService::new(
        store,
        analysis,
        Arc::new(StyleCatalog::builtin()),
        ServiceOptions::from(&config),
    ));

    let app_state = AppState { makeup_service };
    let body_limit = config.max_body_bytes;

    info!(
        "Starting HTTP server on {}:{} (uploads in {})",
        config.host,
        config.port,
        upload_dir.display()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(json_config(body_limit))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
            .service(Files::new("/", upload_dir.clone()))
    })
    .bind(config.bind_address())?
    .run()
    .await?;

    Ok(())
}
