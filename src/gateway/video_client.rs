use super::poll::{JobPoller, Sleeper};
use crate::{
    config::{GatewayConfig, PexelsConfig, PollPolicy, StabilityConfig},
    error::{GatewayError, Result},
    models::{
        ImageUpload, PexelsVideoSearchResponse, StabilityJobSubmission, UpstreamJob, VideoPayload,
    },
    upstream::{call_upstream, never_empty, UpstreamRequest, UpstreamResponse, UpstreamTransport},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

const PEXELS_VIDEOS: &str = "Pexels video search";
const STABILITY_VIDEO: &str = "Stability AI image-to-video";

#[derive(Clone)]
pub struct VideoClient {
    transport: Arc<dyn UpstreamTransport>,
    sleeper: Arc<dyn Sleeper>,
    stability: StabilityConfig,
    pexels: PexelsConfig,
    poll: PollPolicy,
}

impl VideoClient {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        sleeper: Arc<dyn Sleeper>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            transport,
            sleeper,
            stability: config.stability.clone(),
            pexels: config.pexels.clone(),
            poll: config.poll,
        }
    }

    pub fn search_api_key(&self) -> Result<&str> {
        self.pexels
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))
    }

    pub fn generation_api_key(&self) -> Result<&str> {
        self.stability
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))
    }

    /// Searches each candidate query in order and returns the first hit.
    ///
    /// Failures on any candidate but the last are logged and skipped. The
    /// last candidate is the caller's own prompt, so its failure is reported.
    pub async fn search(&self, candidates: &[String]) -> Result<VideoPayload> {
        let api_key = self.search_api_key()?;

        for (index, query) in candidates.iter().enumerate() {
            let is_last = index + 1 == candidates.len();
            log::info!("Searching stock videos for: {}", query);
            match self.search_one(api_key, query).await {
                Ok(link) => return Ok(VideoPayload::Url(link)),
                Err(GatewayError::NotFound(_)) => continue,
                Err(e) if !is_last => {
                    log::warn!("Video search for '{}' failed, trying next query: {}", query, e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(GatewayError::not_found("No videos found for this prompt"))
    }

    async fn search_one(&self, api_key: &str, query: &str) -> Result<String> {
        let request = UpstreamRequest::get(format!("{}/videos/search", self.pexels.base_url))
            .header("Authorization", api_key)
            .query("query", query)
            .query("per_page", "1");

        let link = call_upstream(
            self.transport.as_ref(),
            PEXELS_VIDEOS,
            request,
            |response| {
                let parsed: PexelsVideoSearchResponse = response.json()?;
                Ok(parsed
                    .videos
                    .iter()
                    .find_map(|video| video.best_link().map(String::from)))
            },
            |link: &Option<String>| link.is_none(),
        )
        .await?;

        link.ok_or_else(|| GatewayError::not_found("No videos found for this prompt"))
    }

    /// Submits an image-to-video job and holds the caller until it finishes,
    /// fails or exhausts the poll policy.
    pub async fn generate_from_image(&self, image: &ImageUpload) -> Result<VideoPayload> {
        let api_key = self.generation_api_key()?;

        let submission = UpstreamRequest::post(format!(
            "{}/v2beta/image-to-video",
            self.stability.base_url
        ))
        .bearer(api_key)
        .file_part(
            "image",
            image.bytes.clone(),
            image.filename_or_default(),
            image.content_type.clone(),
        )
        .text_part("seed", "0")
        .text_part("cfg_scale", "1.8")
        .text_part("motion_bucket_id", "127");

        let submitted = call_upstream(
            self.transport.as_ref(),
            STABILITY_VIDEO,
            submission,
            |response| response.json::<StabilityJobSubmission>(),
            never_empty,
        )
        .await?;

        log::info!("Video generation job submitted: {}", submitted.id);

        let mut job = UpstreamJob::submitted(submitted.id);
        let poller = JobPoller::new(self.poll, self.sleeper.as_ref(), STABILITY_VIDEO);
        let ready = poller
            .wait(&mut job, |job_id| self.fetch_result(api_key, job_id))
            .await?;

        if ready.body.is_empty() {
            return Err(GatewayError::upstream("Video job finished with an empty result"));
        }
        Ok(VideoPayload::Base64(STANDARD.encode(&ready.body)))
    }

    async fn fetch_result(&self, api_key: &str, job_id: String) -> Result<UpstreamResponse> {
        let request = UpstreamRequest::get(format!(
            "{}/v2beta/image-to-video/result/{}",
            self.stability.base_url, job_id
        ))
        .bearer(api_key)
        .header("Accept", "video/*");

        self.transport.send(request).await
    }
}
