use serde::{Deserialize, Serialize};

use super::common::ImageUpload;

/// `/generate-video` input. An attached image selects the asynchronous
/// image-to-video path; otherwise `prompt` drives a stock-video search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateVideoRequest {
    pub prompt: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
}

impl GenerateVideoRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            image: None,
        }
    }

    pub fn from_image(image: ImageUpload) -> Self {
        Self {
            prompt: None,
            image: Some(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoPayload {
    #[serde(rename = "video_b64")]
    Base64(String),
    #[serde(rename = "video_url")]
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Ready,
    Failed,
}

/// An upstream generation job awaited by the poll loop. Lives only on the
/// handling request's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamJob {
    pub job_id: String,
    pub status: JobStatus,
}

impl UpstreamJob {
    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityJobSubmission {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsVideoFile {
    pub link: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsVideo {
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<PexelsVideoFile>,
}

impl PexelsVideo {
    /// HD rendition when one exists, otherwise the first file listed.
    pub fn best_link(&self) -> Option<&str> {
        self.video_files
            .iter()
            .find(|f| f.quality.as_deref() == Some("hd"))
            .or_else(|| self.video_files.first())
            .map(|f| f.link.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsVideoSearchResponse {
    #[serde(default)]
    pub videos: Vec<PexelsVideo>,
}
