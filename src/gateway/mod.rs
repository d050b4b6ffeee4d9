pub mod image_client;
pub mod poll;
pub mod text_client;
pub mod upscale_client;
pub mod video_client;

use crate::{
    config::GatewayConfig,
    error::{GatewayError, Result},
    models::{
        non_empty, non_empty_upload, AnalysisFramework, AnalysisRequest, GenerateImageRequest,
        GenerateVideoRequest, ImagePayload, UpscaleImageRequest, VideoPayload,
    },
    upstream::{HttpTransport, UpstreamTransport},
};
use serde_json::Value;
use std::sync::Arc;

pub use image_client::ImageClient;
pub use poll::{JobPoller, PollState, Sleeper, TokioSleeper};
pub use text_client::{strip_code_fences, TextClient};
pub use upscale_client::UpscaleClient;
pub use video_client::VideoClient;

/// The request façade: validates input, checks the relevant credential and
/// delegates to exactly one upstream client.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    image_client: ImageClient,
    video_client: VideoClient,
    upscale_client: UpscaleClient,
    text_client: TextClient,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport), Arc::new(TokioSleeper)))
    }

    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn UpstreamTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            image_client: ImageClient::new(transport.clone(), &config),
            video_client: VideoClient::new(transport.clone(), sleeper, &config),
            upscale_client: UpscaleClient::new(transport.clone(), &config),
            text_client: TextClient::new(transport, &config),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn video(&self) -> &VideoClient {
        &self.video_client
    }

    pub fn upscale(&self) -> &UpscaleClient {
        &self.upscale_client
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }

    pub async fn generate_image(&self, request: GenerateImageRequest) -> Result<ImagePayload> {
        let prompt = non_empty(request.prompt.as_deref())
            .ok_or_else(|| GatewayError::validation("Prompt is required"))?;

        log::info!("Generating image for prompt: {}", prompt);
        self.image_client.generate(prompt).await
    }

    /// An attached image takes the asynchronous image-to-video path; a bare
    /// prompt takes the stock-video search path.
    pub async fn generate_video(&self, request: GenerateVideoRequest) -> Result<VideoPayload> {
        if let Some(image) = non_empty_upload(request.image.as_ref()) {
            log::info!("Generating video from uploaded image");
            return self.video_client.generate_from_image(image).await;
        }

        let prompt = non_empty(request.prompt.as_deref())
            .ok_or_else(|| GatewayError::validation("An image file or prompt is required"))?;

        // Check before expansion so a missing key never costs an outbound call.
        self.video_client.search_api_key()?;

        let mut candidates = if self.config.video_query_expansion {
            self.text_client.expand_query(prompt).await
        } else {
            Vec::new()
        };
        candidates.push(prompt.to_string());

        log::info!("Searching video for prompt: {}", prompt);
        self.video_client.search(&candidates).await
    }

    pub async fn upscale_image(&self, request: UpscaleImageRequest) -> Result<ImagePayload> {
        let image = non_empty_upload(request.image.as_ref());
        let prompt = non_empty(request.prompt.as_deref());
        let (image, prompt) = match (image, prompt) {
            (Some(image), Some(prompt)) => (image, prompt),
            _ => return Err(GatewayError::validation("Image file and prompt are required")),
        };

        self.upscale_client.upscale(image, prompt).await
    }

    /// Any failure after the credential check is reported as a generic
    /// `Analysis` error; the cause is only logged.
    pub async fn generate_analysis(&self, request: AnalysisRequest) -> Result<Value> {
        let topic = non_empty(request.topic.as_deref());
        let analysis_type = non_empty(request.analysis_type.as_deref());
        let (topic, analysis_type) = match (topic, analysis_type) {
            (Some(topic), Some(analysis_type)) => (topic, analysis_type),
            _ => {
                return Err(GatewayError::validation(
                    "Topic and analysis type are required",
                ))
            }
        };

        self.text_client.api_key()?;

        let framework = AnalysisFramework::parse(analysis_type);
        log::info!(
            "Generating {} for topic: {}",
            framework.display_name(),
            topic
        );

        self.text_client
            .analyze(topic, &framework)
            .await
            .map_err(|e| {
                log::error!("Analysis generation failed: {}", e);
                GatewayError::Analysis(
                    "Failed to generate analysis. The AI model may have returned an invalid format."
                        .to_string(),
                )
            })
    }
}
