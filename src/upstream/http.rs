use super::{FormValue, Method, UpstreamBody, UpstreamRequest, UpstreamResponse, UpstreamTransport};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use std::time::Duration;

/// `UpstreamTransport` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(120))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::configuration(format!("HTTP client could not be built: {}", e))
        })?;
        Ok(Self { client })
    }

    fn build_form(parts: Vec<super::FormPart>) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part.value {
                FormValue::Text(text) => form.text(part.name, text),
                FormValue::File {
                    bytes,
                    filename,
                    content_type,
                } => {
                    let mut file = multipart::Part::bytes(bytes).file_name(filename);
                    if let Some(content_type) = content_type {
                        file = file.mime_str(&content_type).map_err(|e| {
                            GatewayError::validation(format!("Invalid file content type: {}", e))
                        })?;
                    }
                    form.part(part.name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            UpstreamBody::Empty => builder,
            UpstreamBody::Json(body) => builder.json(&body),
            UpstreamBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        log::debug!(
            "Upstream {} responded {} ({} bytes)",
            request.url,
            status,
            body.len()
        );

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_errors_do_not_echo_the_request_url() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(5)).unwrap();
        let request = UpstreamRequest::get("http://127.0.0.1:1/v1beta/models/m:generateContent")
            .query("key", "SECRET-GEMINI-KEY");

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
        assert!(!err.to_string().contains("SECRET-GEMINI-KEY"));
        assert!(!err.to_string().contains("127.0.0.1"));
    }
}
