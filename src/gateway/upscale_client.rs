use crate::{
    config::{GatewayConfig, StabilityConfig},
    error::{GatewayError, Result},
    models::{ImagePayload, ImageUpload},
    upstream::{call_upstream, never_empty, UpstreamRequest, UpstreamTransport},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

const STABILITY_UPSCALE: &str = "Stability AI upscale";

#[derive(Clone)]
pub struct UpscaleClient {
    transport: Arc<dyn UpstreamTransport>,
    stability: StabilityConfig,
}

impl UpscaleClient {
    pub fn new(transport: Arc<dyn UpstreamTransport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            stability: config.stability.clone(),
        }
    }

    /// Sends the image to the conservative upscaler and returns the enhanced
    /// image bytes base64-encoded.
    pub async fn upscale(&self, image: &ImageUpload, prompt: &str) -> Result<ImagePayload> {
        let api_key = self
            .stability
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))?;

        log::info!(
            "Upscaling {} ({} bytes)",
            image.filename_or_default(),
            image.bytes.len()
        );

        let request = UpstreamRequest::post(format!(
            "{}/v2beta/stable-image/upscale/conservative",
            self.stability.base_url
        ))
        .bearer(api_key)
        .header("Accept", "image/*")
        .file_part(
            "image",
            image.bytes.clone(),
            image.filename_or_default(),
            image.content_type.clone(),
        )
        .text_part("prompt", prompt)
        .text_part("output_format", "png");

        call_upstream(
            self.transport.as_ref(),
            STABILITY_UPSCALE,
            request,
            |response| {
                if response.body.is_empty() {
                    return Err(GatewayError::upstream("Upscaler returned an empty image"));
                }
                Ok(ImagePayload::Base64(STANDARD.encode(&response.body)))
            },
            never_empty,
        )
        .await
    }
}
