use crate::{
    config::{GatewayConfig, ImageBackend, PexelsConfig, StabilityConfig},
    error::{GatewayError, Result},
    models::{ImagePayload, PexelsPhotoSearchResponse, StabilityTextToImageResponse},
    upstream::{call_upstream, never_empty, UpstreamRequest, UpstreamTransport},
};
use serde_json::json;
use std::sync::Arc;

const STABILITY: &str = "Stability AI";
const PEXELS: &str = "Pexels";

#[derive(Clone)]
pub struct ImageClient {
    transport: Arc<dyn UpstreamTransport>,
    backend: ImageBackend,
    stability: StabilityConfig,
    pexels: PexelsConfig,
}

impl ImageClient {
    pub fn new(transport: Arc<dyn UpstreamTransport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            backend: config.image_backend,
            stability: config.stability.clone(),
            pexels: config.pexels.clone(),
        }
    }

    pub fn backend(&self) -> ImageBackend {
        self.backend
    }

    /// Generates (Stability) or searches for (Pexels) an image matching `prompt`.
    pub async fn generate(&self, prompt: &str) -> Result<ImagePayload> {
        match self.backend {
            ImageBackend::Stability => self.text_to_image(prompt).await,
            ImageBackend::Pexels => self.search_photos(prompt).await,
        }
    }

    async fn text_to_image(&self, prompt: &str) -> Result<ImagePayload> {
        let api_key = self
            .stability
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))?;

        log::info!("Generating image with engine: {}", self.stability.engine);

        let request = UpstreamRequest::post(format!(
            "{}/v1/generation/{}/text-to-image",
            self.stability.base_url, self.stability.engine
        ))
        .bearer(api_key)
        .header("Accept", "application/json")
        .json(json!({
            "text_prompts": [{ "text": prompt }],
            "cfg_scale": 7,
            "height": 1024,
            "width": 1024,
            "samples": 1,
            "steps": 30,
        }));

        call_upstream(
            self.transport.as_ref(),
            STABILITY,
            request,
            |response| {
                let parsed: StabilityTextToImageResponse = response.json()?;
                parsed
                    .artifacts
                    .into_iter()
                    .next()
                    .map(|artifact| ImagePayload::Base64(artifact.base64))
                    .ok_or_else(|| GatewayError::upstream("No images generated"))
            },
            never_empty,
        )
        .await
    }

    async fn search_photos(&self, prompt: &str) -> Result<ImagePayload> {
        let api_key = self
            .pexels
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))?;

        log::info!("Searching photos for prompt: {}", prompt);

        let request = UpstreamRequest::get(format!("{}/v1/search", self.pexels.base_url))
            .header("Authorization", api_key)
            .query("query", prompt)
            .query("per_page", self.pexels.per_page.to_string());

        let urls = call_upstream(
            self.transport.as_ref(),
            PEXELS,
            request,
            |response| {
                let parsed: PexelsPhotoSearchResponse = response.json()?;
                Ok(parsed
                    .photos
                    .iter()
                    .filter_map(|photo| photo.best_url().map(String::from))
                    .collect::<Vec<_>>())
            },
            |urls: &Vec<String>| urls.is_empty(),
        )
        .await?;

        if self.pexels.per_page == 1 {
            Ok(ImagePayload::Url(urls.into_iter().next().unwrap_or_default()))
        } else {
            Ok(ImagePayload::Urls(urls))
        }
    }
}
