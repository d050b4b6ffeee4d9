use super::form::{is_multipart, read_body, read_form};
use crate::{
    error::GatewayError,
    gateway::Gateway,
    logger,
    models::{AnalysisRequest, GenerateImageRequest, GenerateVideoRequest, UpscaleImageRequest},
};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use uuid::Uuid;

type HandlerResult = Result<HttpResponse, GatewayError>;

fn report(request_id: &Uuid, route: &str, err: GatewayError) -> GatewayError {
    if err.status_code() >= 500 {
        log::error!("[req:{}] {} failed: {}", request_id, route, err);
    } else {
        log::warn!("[req:{}] {} rejected: {}", request_id, route, err);
    }
    err
}

pub async fn generate_image(
    gateway: web::Data<Gateway>,
    body: web::Json<GenerateImageRequest>,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    log::info!("[req:{}] POST /generate-image", request_id);
    let _timer = logger::timer(format!("[req:{}] generate-image", request_id));

    let payload = gateway
        .generate_image(body.into_inner())
        .await
        .map_err(|e| report(&request_id, "generate-image", e))?;
    Ok(HttpResponse::Ok().json(payload))
}

/// Accepts JSON `{prompt}` or a multipart form with `image` (and/or `prompt`).
pub async fn generate_video(
    gateway: web::Data<Gateway>,
    req: HttpRequest,
    payload: web::Payload,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    log::info!("[req:{}] POST /generate-video", request_id);
    let _timer = logger::timer(format!("[req:{}] generate-video", request_id));

    let request = if is_multipart(&req) {
        let mut form = read_form(&req, payload)
            .await
            .map_err(|e| report(&request_id, "generate-video", e))?;
        GenerateVideoRequest {
            prompt: form.text("prompt"),
            image: form.take_file("image"),
        }
    } else {
        let body = read_body(payload)
            .await
            .map_err(|e| report(&request_id, "generate-video", e))?;
        serde_json::from_slice::<GenerateVideoRequest>(&body).map_err(|e| {
            report(
                &request_id,
                "generate-video",
                GatewayError::validation(format!("Invalid JSON body: {}", e)),
            )
        })?
    };

    let payload = gateway
        .generate_video(request)
        .await
        .map_err(|e| report(&request_id, "generate-video", e))?;
    Ok(HttpResponse::Ok().json(payload))
}

pub async fn upscale_image(
    gateway: web::Data<Gateway>,
    req: HttpRequest,
    payload: web::Payload,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    log::info!("[req:{}] POST /upscale-image", request_id);
    let _timer = logger::timer(format!("[req:{}] upscale-image", request_id));

    if !is_multipart(&req) {
        return Err(report(
            &request_id,
            "upscale-image",
            GatewayError::validation("Image file and prompt are required"),
        ));
    }

    let mut form = read_form(&req, payload)
        .await
        .map_err(|e| report(&request_id, "upscale-image", e))?;
    let request = UpscaleImageRequest {
        image: form.take_file("image"),
        prompt: form.text("prompt"),
    };

    let payload = gateway
        .upscale_image(request)
        .await
        .map_err(|e| report(&request_id, "upscale-image", e))?;
    Ok(HttpResponse::Ok().json(payload))
}

pub async fn generate_analysis(
    gateway: web::Data<Gateway>,
    body: web::Json<AnalysisRequest>,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    log::info!("[req:{}] POST /generate-analysis", request_id);
    let _timer = logger::timer(format!("[req:{}] generate-analysis", request_id));

    let analysis = gateway
        .generate_analysis(body.into_inner())
        .await
        .map_err(|e| report(&request_id, "generate-analysis", e))?;
    Ok(HttpResponse::Ok().json(analysis))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
