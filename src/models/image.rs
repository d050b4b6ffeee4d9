use serde::{Deserialize, Serialize};

use super::common::ImageUpload;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: Option<String>,
}

impl GenerateImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpscaleImageRequest {
    pub image: Option<ImageUpload>,
    pub prompt: Option<String>,
}

/// Success body of `/generate-image` and `/upscale-image`.
///
/// Serializes as a single-key object, e.g. `{"image_b64": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePayload {
    #[serde(rename = "image_b64")]
    Base64(String),
    #[serde(rename = "image_url")]
    Url(String),
    #[serde(rename = "image_urls")]
    Urls(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityArtifact {
    pub base64: String,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityTextToImageResponse {
    #[serde(default)]
    pub artifacts: Vec<StabilityArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsPhotoSource {
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsPhoto {
    pub id: u64,
    pub src: PexelsPhotoSource,
}

impl PexelsPhoto {
    pub fn best_url(&self) -> Option<&str> {
        self.src
            .large
            .as_deref()
            .or(self.src.original.as_deref())
            .or(self.src.medium.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PexelsPhotoSearchResponse {
    #[serde(default)]
    pub photos: Vec<PexelsPhoto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_serializes_under_a_single_key() {
        let b64 = serde_json::to_value(ImagePayload::Base64("aGk=".into())).unwrap();
        assert_eq!(b64, json!({ "image_b64": "aGk=" }));

        let urls = serde_json::to_value(ImagePayload::Urls(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(urls, json!({ "image_urls": ["a", "b"] }));
    }

    #[test]
    fn missing_prompt_deserializes_to_none() {
        let req: GenerateImageRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.prompt.is_none());
    }

    #[test]
    fn photo_prefers_large_source() {
        let photo: PexelsPhoto = serde_json::from_value(json!({
            "id": 7,
            "src": { "original": "o.jpg", "large": "l.jpg" }
        }))
        .unwrap();
        assert_eq!(photo.best_url(), Some("l.jpg"));
    }
}
