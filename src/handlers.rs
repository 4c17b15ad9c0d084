// src/handlers.rs
use crate::{AppState, errors::StudioError, models::*};
use actix_web::{HttpResponse, web};
use log::debug;

pub async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    let mode = if data.makeup_service.is_live() { "live" } else { "mock" };
    HttpResponse::Ok().json(ApiResponse::ok(
        "Makeup API is running",
        HealthStatus {
            status: "ok".to_string(),
            message: format!("Makeup API is running in {} mode", mode),
        },
    ))
}

pub async fn list_styles(data: web::Data<AppState>) -> HttpResponse {
    let styles = data.makeup_service.styles().await;
    HttpResponse::Ok().json(ApiResponse::ok("Styles retrieved successfully", styles))
}

pub async fn get_style(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let style = data.makeup_service.style(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Style details retrieved successfully", style)))
}

pub async fn upload_image(
    body: web::Json<UploadRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let uploaded = data.makeup_service.upload(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Image uploaded successfully", uploaded)))
}

/// The `{style}` segment is informational; `style_id` in the body wins.
pub async fn apply_makeup_style(
    path: web::Path<String>,
    body: web::Json<ApplyRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let route_style = path.into_inner();
    let req = body.into_inner();
    if req.style_id.as_deref().is_some_and(|s| s != route_style) {
        debug!("Route style {} differs from body style {:?}", route_style, req.style_id);
    }

    let result = data.makeup_service.apply(req).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Makeup applied successfully", result)))
}

pub async fn get_result(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let result = data.makeup_service.result(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Result retrieved successfully", result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_state, sample_jpeg};
    use crate::{configure_routes, json_config};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use base64::{Engine as _, engine::general_purpose};
    use serde_json::{Value, json};

    macro_rules! app {
        ($dir:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(mock_state($dir).await))
                    .app_data(json_config(10 * 1024 * 1024))
                    .configure(configure_routes)
                    .service(actix_files::Files::new("/", $dir)),
            )
            .await
        };
    }

    fn jpeg_b64() -> String {
        general_purpose::STANDARD.encode(sample_jpeg(100, 100))
    }

    #[actix_web::test]
    async fn health_reports_mock_mode() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        assert!(body["data"]["message"].as_str().unwrap().contains("mock"));
    }

    #[actix_web::test]
    async fn styles_are_listed_with_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::get().uri("/api/v1/makeup/styles").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let styles = body["data"].as_array().unwrap();
        assert_eq!(styles.len(), 6);
        assert_eq!(styles[3]["id"], "evening");
        assert_eq!(styles[3]["category"], "special-event");
        assert!(!styles[3]["description"].as_str().unwrap().is_empty());

        let req = test::TestRequest::get().uri("/api/v1/makeup/styles/unknown").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn upload_missing_fields_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        for body in [json!({ "format": "jpg" }), json!({ "image_data": jpeg_b64() })] {
            let req = test::TestRequest::post()
                .uri("/api/v1/makeup/upload")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn malformed_json_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/upload")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn undecodable_payload_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/upload")
            .set_json(json!({ "image_data": "%%%", "format": "jpg" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn data_url_and_raw_uploads_store_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());
        let raw = jpeg_b64();

        let mut stored = Vec::new();
        for image_data in [raw.clone(), format!("data:image/jpeg;base64,{}", raw)] {
            let req = test::TestRequest::post()
                .uri("/api/v1/makeup/upload")
                .set_json(json!({ "image_data": image_data, "format": "jpg" }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            let path = body["data"]["file_path"].as_str().unwrap().to_string();
            stored.push(std::fs::read(path).unwrap());
        }

        assert_eq!(stored[0], stored[1]);
    }

    #[actix_web::test]
    async fn upload_then_apply_serves_the_result_image() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/upload")
            .set_json(json!({ "image_data": jpeg_b64(), "format": "jpg" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let image_id = body["data"]["id"].as_str().unwrap().to_string();
        assert!(image_id.starts_with("img_"));

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/apply/natural")
            .set_json(json!({ "image_id": image_id, "style_id": "natural" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let data = &body["data"];
        assert_eq!(data["status"], "completed");
        assert!(!data["analysis"].as_str().unwrap().is_empty());

        let url = data["result_url"].as_str().unwrap();
        let filename = url.rsplit('/').next().unwrap();
        let req = test::TestRequest::get().uri(&format!("/{}", filename)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = test::read_body(resp).await;
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[actix_web::test]
    async fn apply_with_unknown_image_or_style_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/apply/nonexistent-style")
            .set_json(json!({ "image_id": "img_0_nothing", "style_id": "nonexistent-style" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "completed");
        assert!(body["data"]["result_url"].as_str().unwrap().ends_with(".jpg"));
    }

    #[actix_web::test]
    async fn apply_missing_fields_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::post()
            .uri("/api/v1/makeup/apply/natural")
            .set_json(json!({ "image_id": "img_1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn result_lookup_for_unknown_id_is_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());

        let req = test::TestRequest::get()
            .uri("/api/v1/makeup/result/result_123")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], "result_123");
        assert_eq!(body["data"]["status"], "completed");
    }
}
