//! actix-web surface of the gateway.

pub mod form;
pub mod handlers;

use crate::{config::GatewayConfig, error::GatewayError, gateway::Gateway, models::ErrorBody};
use actix_cors::Cors;
use actix_web::{
    http::StatusCode, middleware, web, App, HttpResponse, HttpServer, ResponseError,
};

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(GatewayError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(ErrorBody::new(self.message()))
    }
}

/// Registers routes and makes JSON extraction failures use the error envelope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(form::MAX_BODY_BYTES)
            .error_handler(|err, _req| {
                GatewayError::validation(format!("Invalid JSON body: {}", err)).into()
            }),
    )
    .route("/health", web::get().to(handlers::health))
    .route("/generate-image", web::post().to(handlers::generate_image))
    .route("/generate-video", web::post().to(handlers::generate_video))
    .route("/upscale-image", web::post().to(handlers::upscale_image))
    .route("/generate-analysis", web::post().to(handlers::generate_analysis));
}

/// Allow-list CORS when origins are configured, any origin otherwise.
pub fn cors(config: &GatewayConfig) -> Cors {
    let base = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600);

    let origins: Vec<&str> = config
        .allowed_origins
        .iter()
        .map(String::as_str)
        .filter(|o| *o != "*")
        .collect();

    if origins.is_empty() {
        return base.allow_any_origin();
    }
    origins
        .into_iter()
        .fold(base, |cors, origin| cors.allowed_origin(origin))
}

pub async fn run(config: GatewayConfig) -> std::io::Result<()> {
    let bind_address = config.bind_address();
    let gateway = Gateway::new(config.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let gateway = web::Data::new(gateway);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config))
            .wrap(middleware::Logger::default())
            .app_data(gateway.clone())
            .configure(configure)
    })
    .bind(bind_address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PexelsConfig, PollPolicy, StabilityConfig, TextGenConfig};
    use crate::gateway::poll::MockSleeper;
    use crate::upstream::{Method, MockUpstreamTransport, UpstreamResponse};
    use actix_web::{http::header, test};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const BOUNDARY: &str = "gatewaytestboundary";

    fn keyed_config() -> GatewayConfig {
        GatewayConfig::new()
            .with_stability(StabilityConfig::new().with_api_key("sk-stability"))
            .with_pexels(PexelsConfig::new().with_api_key("pexels-key"))
            .with_text(TextGenConfig::new().with_api_key("gemini-key"))
            .with_poll_policy(PollPolicy::new(3, Duration::from_secs(5)))
    }

    fn data(
        config: GatewayConfig,
        transport: MockUpstreamTransport,
        sleeper: MockSleeper,
    ) -> web::Data<Gateway> {
        web::Data::new(Gateway::with_transport(
            config,
            Arc::new(transport),
            Arc::new(sleeper),
        ))
    }

    fn multipart_body(image: Option<Vec<u8>>, prompt: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(bytes) = image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(prompt) = prompt {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{}\r\n",
                    BOUNDARY, prompt
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    fn silent_transport() -> MockUpstreamTransport {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().never();
        transport
    }

    #[actix_web::test]
    async fn missing_prompt_returns_400_envelope() {
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), silent_transport(), MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-image")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Prompt is required" }));
    }

    #[actix_web::test]
    async fn malformed_json_uses_error_envelope() {
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), silent_transport(), MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-analysis")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[actix_web::test]
    async fn missing_credential_returns_500_without_calling_upstream() {
        let app = test::init_service(
            App::new()
                .app_data(data(GatewayConfig::new(), silent_transport(), MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-video")
            .set_json(json!({ "prompt": "ocean waves" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "API key not found" }));
    }

    #[actix_web::test]
    async fn generated_image_is_wrapped_in_single_key() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(UpstreamResponse::json_body(
                200,
                &json!({ "artifacts": [{ "base64": "aW1n" }] }),
            ))
        });
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), transport, MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-image")
            .set_json(json!({ "prompt": "lighthouse at dawn" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "image_b64": "aW1n" }));
    }

    #[actix_web::test]
    async fn upscale_accepts_multipart_and_returns_base64() {
        let enhanced = vec![7u8, 8, 9, 10];
        let expected = enhanced.clone();
        let mut transport = MockUpstreamTransport::new();
        transport
            .expect_send()
            .withf(|req| req.url.ends_with("/upscale/conservative"))
            .times(1)
            .returning(move |_| Ok(UpstreamResponse::new(200, enhanced.clone())));
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), transport, MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = multipart_request(
            "/upscale-image",
            multipart_body(Some(vec![1, 2, 3, 4]), Some("a sharp cat")),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let decoded = STANDARD.decode(body["image_b64"].as_str().unwrap()).unwrap();
        assert_eq!(decoded, expected);
    }

    #[actix_web::test]
    async fn upscale_without_prompt_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), silent_transport(), MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = multipart_request("/upscale-image", multipart_body(Some(vec![1, 2]), None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Image file and prompt are required" }));
    }

    #[actix_web::test]
    async fn multipart_video_job_times_out_with_504() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(4).returning(|req| {
            if req.method == Method::Post {
                Ok(UpstreamResponse::json_body(200, &json!({ "id": "job-9" })))
            } else {
                Ok(UpstreamResponse::new(202, Vec::new()))
            }
        });
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().times(2).returning(|_| ());
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), transport, sleeper))
                .configure(configure),
        )
        .await;

        let req = multipart_request("/generate-video", multipart_body(Some(vec![0xFF, 0xD8]), None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }

    #[actix_web::test]
    async fn multipart_video_job_returns_video_b64() {
        let mut transport = MockUpstreamTransport::new();
        let mut polls = 0;
        transport.expect_send().times(3).returning(move |req| {
            if req.method == Method::Post {
                return Ok(UpstreamResponse::json_body(200, &json!({ "id": "job-1" })));
            }
            polls += 1;
            if polls == 1 {
                Ok(UpstreamResponse::new(202, Vec::new()))
            } else {
                Ok(UpstreamResponse::new(200, b"mp4!".to_vec()))
            }
        });
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().times(1).returning(|_| ());
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), transport, sleeper))
                .configure(configure),
        )
        .await;

        let req = multipart_request("/generate-video", multipart_body(Some(vec![0xFF]), None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "video_b64": STANDARD.encode(b"mp4!") }));
    }

    #[actix_web::test]
    async fn analysis_reply_is_passed_through() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(UpstreamResponse::json_body(
                200,
                &json!({ "candidates": [{ "content": { "parts": [{
                    "text": "```json\n{\"political\": [\"Subsidies\"], \"extra\": 1}\n```"
                }] } }] }),
            ))
        });
        let app = test::init_service(
            App::new()
                .app_data(data(keyed_config(), transport, MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-analysis")
            .set_json(json!({ "topic": "solar panels", "analysis_type": "PESTLE Analysis" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "political": ["Subsidies"], "extra": 1 }));
    }

    #[actix_web::test]
    async fn cors_echoes_allowed_origin() {
        let config = keyed_config().with_allowed_origins(["https://studio.example"]);
        let app = test::init_service(
            App::new()
                .wrap(cors(&config))
                .app_data(data(config.clone(), silent_transport(), MockSleeper::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header((header::ORIGIN, "https://studio.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://studio.example")
        );
    }
}
