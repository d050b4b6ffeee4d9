use crate::{
    config::{GatewayConfig, TextGenConfig},
    error::{GatewayError, Result},
    models::{AnalysisFramework, GeminiGenerateResponse},
    upstream::{call_upstream, never_empty, UpstreamRequest, UpstreamTransport},
};
use serde_json::{json, Value};
use std::sync::Arc;

const GEMINI: &str = "Gemini";
const MAX_ALTERNATIVES: usize = 3;

#[derive(Clone)]
pub struct TextClient {
    transport: Arc<dyn UpstreamTransport>,
    config: TextGenConfig,
}

impl TextClient {
    pub fn new(transport: Arc<dyn UpstreamTransport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            config: config.text.clone(),
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration("API key not found"))
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Sends a single-turn prompt and returns the model's text reply.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;

        log::info!("Invoking text model: {}", self.config.model);
        log::debug!("Text generation prompt: {}", prompt);

        let request = UpstreamRequest::post(format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        ))
        .header("x-goog-api-key", api_key)
        .json(json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        }));

        call_upstream(
            self.transport.as_ref(),
            GEMINI,
            request,
            |response| {
                let parsed: GeminiGenerateResponse = response.json()?;
                parsed
                    .text()
                    .ok_or_else(|| GatewayError::upstream("Model returned an empty reply"))
            },
            never_empty,
        )
        .await
    }

    /// Asks the model for up to three alternative search phrasings.
    ///
    /// Never fails: any error yields an empty list and the caller searches
    /// with the original prompt alone.
    pub async fn expand_query(&self, prompt: &str) -> Vec<String> {
        if !self.is_configured() {
            log::debug!("Query expansion skipped: no text model configured");
            return Vec::new();
        }

        let instruction = format!(
            "Suggest up to {} short alternative search phrases for finding stock footage of: \"{}\". \
             Respond with only a JSON array of strings, no markdown.",
            MAX_ALTERNATIVES, prompt
        );

        let reply = match self.generate(&instruction).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Query expansion failed, using original prompt: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(strip_code_fences(&reply)) {
            Ok(phrases) => {
                let mut alternatives: Vec<String> = Vec::new();
                for phrase in phrases {
                    let phrase = phrase.trim();
                    if phrase.is_empty()
                        || phrase.eq_ignore_ascii_case(prompt.trim())
                        || alternatives.iter().any(|a| a.eq_ignore_ascii_case(phrase))
                    {
                        continue;
                    }
                    alternatives.push(phrase.to_string());
                    if alternatives.len() == MAX_ALTERNATIVES {
                        break;
                    }
                }
                log::debug!("Expanded query into {:?}", alternatives);
                alternatives
            }
            Err(e) => {
                log::warn!("Query expansion reply was not a JSON array: {}", e);
                Vec::new()
            }
        }
    }

    /// Runs a framework analysis and returns the model's JSON object as-is.
    pub async fn analyze(&self, topic: &str, framework: &AnalysisFramework) -> Result<Value> {
        if !framework.is_recognized() {
            log::warn!(
                "Unrecognized analysis type '{}', passing through to model",
                framework.display_name()
            );
        }

        let reply = self.generate(&framework.instruction(topic)).await?;
        serde_json::from_str(strip_code_fences(&reply)).map_err(|e| {
            log::debug!("Unparseable analysis reply: {}", reply);
            GatewayError::Analysis(format!("Model reply was not valid JSON: {}", e))
        })
    }
}

/// Removes a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language_tag() {
        let reply = "```json\n{\"strengths\": [\"brand\"]}\n```";
        assert_eq!(strip_code_fences(reply), "{\"strengths\": [\"brand\"]}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn tolerates_missing_closing_fence() {
        assert_eq!(strip_code_fences("```\n[\"x\"]"), "[\"x\"]");
    }
}
